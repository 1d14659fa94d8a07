use eframe::egui;

/// Largest size with the frame's aspect ratio that fits inside `area`.
///
/// Sizes are truncated to whole pixels. A frame or area with a zero dimension
/// fits nothing.
pub fn fit_size(frame: [usize; 2], area: egui::Vec2) -> egui::Vec2 {
    let [frame_w, frame_h] = frame;
    if frame_w == 0 || frame_h == 0 || area.x < 1.0 || area.y < 1.0 {
        return egui::Vec2::ZERO;
    }

    let (frame_w, frame_h) = (frame_w as f32, frame_h as f32);

    // area wider than the frame: full height, otherwise full width
    if area.x * frame_h > area.y * frame_w {
        let height = area.y.floor();
        egui::vec2((height * frame_w / frame_h).floor(), height)
    } else {
        let width = area.x.floor();
        egui::vec2(width, (width * frame_h / frame_w).floor())
    }
}

/// The fitted frame centered inside `area`.
pub fn fit_rect(frame: [usize; 2], area: egui::Rect) -> egui::Rect {
    egui::Rect::from_center_size(area.center(), fit_size(frame, area.size()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_area_is_limited_by_height() {
        let size = fit_size([640, 480], egui::vec2(1000.0, 300.0));
        assert_eq!(size, egui::vec2(400.0, 300.0));
    }

    #[test]
    fn tall_area_is_limited_by_width() {
        let size = fit_size([1920, 1080], egui::vec2(800.0, 800.0));
        assert_eq!(size, egui::vec2(800.0, 450.0));
    }

    #[test]
    fn matching_aspect_fills_the_area() {
        let size = fit_size([1280, 720], egui::vec2(640.0, 360.0));
        assert_eq!(size, egui::vec2(640.0, 360.0));
    }

    #[test]
    fn fractional_results_are_truncated() {
        // 4:3 frame in a 100x100 area -> 100 x 75, 16:9 -> 100 x 56.25 -> 56.
        assert_eq!(fit_size([4, 3], egui::vec2(100.0, 100.0)), egui::vec2(100.0, 75.0));
        assert_eq!(fit_size([16, 9], egui::vec2(100.0, 100.0)), egui::vec2(100.0, 56.0));
    }

    #[test]
    fn degenerate_inputs_fit_nothing() {
        assert_eq!(fit_size([0, 480], egui::vec2(640.0, 480.0)), egui::Vec2::ZERO);
        assert_eq!(fit_size([640, 480], egui::vec2(0.0, 480.0)), egui::Vec2::ZERO);
    }

    #[test]
    fn rect_is_centered() {
        let area = egui::Rect::from_min_size(egui::pos2(0.0, 100.0), egui::vec2(1000.0, 300.0));
        let rect = fit_rect([640, 480], area);
        assert_eq!(rect.size(), egui::vec2(400.0, 300.0));
        assert_eq!(rect.min, egui::pos2(300.0, 100.0));
        assert_eq!(rect.center(), area.center());
    }
}
