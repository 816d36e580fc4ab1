use eframe::egui::{self, Align, Context, Layout};

use flex_view::analysis::RequestState;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("flex-view");
                    ui.separator();
                    ui.label(format!("orientation: {:?}", self.layout.orientation));
                    if let Some(graph) = self.controller.graph() {
                        ui.label(format!("nodes: {}", graph.len()));
                        ui.label(format!("edges: {}", graph.edges().len()));
                        ui.label(format!("faulty: {}", graph.faulty_nodes().count()));
                    }
                    let can_fit = self
                        .controller
                        .graph()
                        .is_some_and(|graph| graph.is_laid_out() && !graph.is_empty());
                    if ui.add_enabled(can_fit, egui::Button::new("Fit view")).clicked() {
                        self.fit_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(layout_text) = self.layout_text() {
                            ui.label(layout_text);
                        }
                        if self.controller.state() == RequestState::Submitting {
                            ui.spinner();
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(380.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(360.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));
    }

    fn layout_text(&self) -> Option<String> {
        if self.controller.is_layout_pending() {
            return Some("laying out...".to_owned());
        }

        let stats = self.controller.layout_stats()?;
        Some(format!(
            "ranks {}  |  crossings {}  |  reversed {}  |  sweeps {}",
            stats.ranks,
            stats.crossings,
            stats.reversed_edges.len(),
            stats.sweeps
        ))
    }
}
