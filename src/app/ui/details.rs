use eframe::egui::{self, Color32, RichText, Ui};

use flex_view::explain::{ExplanationEntry, ExplanationState};
use flex_view::normalize::{Explanation, Feedback};

use super::super::ViewModel;

fn bullet_list(ui: &mut Ui, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    ui.add_space(4.0);
    ui.label(RichText::new(title).strong());
    for item in items {
        ui.label(format!("- {item}"));
    }
}

fn draw_feedback(ui: &mut Ui, feedback: &Feedback) {
    ui.label(feedback.summary.as_str());
    bullet_list(ui, "Strengths", &feedback.strengths);
    bullet_list(ui, "Weaknesses", &feedback.weaknesses);
    bullet_list(ui, "Recommendations", &feedback.recommendations);
}

fn draw_explanation(ui: &mut Ui, explanation: &Explanation) {
    ui.label(explanation.description.as_str());
    bullet_list(ui, "Concepts", &explanation.concepts);
    bullet_list(ui, "Issues", &explanation.issues);
    bullet_list(ui, "Suggestions", &explanation.suggestions);
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        egui::ScrollArea::vertical()
            .id_salt("details_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.heading("Feedback");
                ui.add_space(6.0);
                match self.controller.feedback() {
                    Some(feedback) => draw_feedback(ui, feedback),
                    None => {
                        ui.label("Feedback appears here after an analysis.");
                    }
                }
                if let Some(issue) = self.controller.feedback_issue() {
                    ui.small(issue.to_string());
                }

                ui.separator();
                self.draw_selection(ui);
            });
    }

    fn draw_selection(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(node) = self.controller.selected_node() else {
            ui.label("Select a node in the graph to explain it.");
            return;
        };

        let node_id = node.id.clone();
        ui.label(RichText::new(node.label.as_str()).strong());
        ui.small(format!("id {}", node.id));
        if let Some(rank) = node.rank() {
            ui.label(format!("Rank: {rank}"));
        }
        if let Some(error) = &node.error {
            ui.label(RichText::new(format!("Fault: {error}")).color(Color32::from_rgb(240, 110, 110)));
        }

        ui.separator();
        ui.label(RichText::new("Explanation").strong());
        let entry = self.controller.selected_explanation().cloned();
        match entry {
            Some(ExplanationEntry {
                state: ExplanationState::Pending,
                ..
            }) => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading explanation...");
                });
            }
            Some(ExplanationEntry {
                state: ExplanationState::Ready(explanation),
                ..
            }) => draw_explanation(ui, &explanation),
            Some(ExplanationEntry {
                state: ExplanationState::Failed(message),
                ..
            }) => {
                ui.label("Explanation unavailable");
                ui.small(message);
                if ui.button("Try again").clicked() {
                    self.controller.select_node(&node_id);
                }
            }
            None => {
                ui.label("Explanation unavailable");
            }
        }

        ui.add_space(6.0);
        if ui.button("Clear selection").clicked() {
            self.controller.clear_selection();
        }
    }
}
