//! Custom egui widgets for the overlay

use egui::{Color32, FontId, RichText, Rounding, Stroke};

/// Style configuration for the command buttons
#[derive(Debug, Clone)]
pub struct ButtonStyle {
    /// Fill color
    pub background: Color32,
    /// Fill color while hovered
    pub hover_background: Color32,
    /// Label color
    pub text_color: Color32,
    /// Label font size
    pub font_size: f32,
    /// Border radius
    pub corner_radius: f32,
    /// Horizontal and vertical padding
    pub padding: (f32, f32),
}

impl ButtonStyle {
    pub fn start() -> Self {
        Self {
            background: Color32::from_rgb(0x4C, 0xAF, 0x50),
            hover_background: Color32::from_rgb(0x45, 0xA0, 0x49),
            ..Default::default()
        }
    }

    pub fn stop() -> Self {
        Self {
            background: Color32::from_rgb(0xF4, 0x43, 0x36),
            hover_background: Color32::from_rgb(0xDA, 0x19, 0x0B),
            ..Default::default()
        }
    }
}

impl Default for ButtonStyle {
    fn default() -> Self {
        Self {
            background: Color32::from_gray(90),
            hover_background: Color32::from_gray(110),
            text_color: Color32::WHITE,
            font_size: 12.0,
            corner_radius: 3.0,
            padding: (20.0, 5.0),
        }
    }
}

/// Draw a flat, borderless command button
pub fn command_button(ui: &mut egui::Ui, label: &str, style: &ButtonStyle) -> egui::Response {
    ui.scope(|ui| {
        let rounding = Rounding::same(style.corner_radius);
        let spacing = ui.spacing_mut();
        spacing.button_padding = egui::vec2(style.padding.0, style.padding.1);

        let widgets = &mut ui.visuals_mut().widgets;
        for (visuals, fill) in [
            (&mut widgets.inactive, style.background),
            (&mut widgets.hovered, style.hover_background),
            (&mut widgets.active, style.hover_background),
        ] {
            visuals.weak_bg_fill = fill;
            visuals.bg_fill = fill;
            visuals.bg_stroke = Stroke::NONE;
            visuals.rounding = rounding;
            visuals.expansion = 0.0;
        }

        let text = RichText::new(label)
            .color(style.text_color)
            .font(FontId::proportional(style.font_size))
            .strong();
        ui.add(egui::Button::new(text))
    })
    .inner
}
