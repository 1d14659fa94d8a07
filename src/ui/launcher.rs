use eframe::egui;

/// Home screen. Returns true when "Launch Camera" was clicked.
pub(super) fn show(ctx: &egui::Context) -> bool {
    let mut launch = false;

    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space((ui.available_height() * 0.2).max(20.0));
            ui.add(egui::Image::new(egui::include_image!("../../assets/logo.svg")).max_width(150.0));
            ui.add_space(16.0);
            ui.label(egui::RichText::new("SmartTerminal").size(28.0).strong());
            ui.add_space(24.0);

            let button = egui::Button::new(egui::RichText::new("Launch Camera").size(16.0))
                .min_size(egui::vec2(180.0, 40.0));
            if ui.add(button).clicked() {
                launch = true;
            }
        });
    });

    launch
}
