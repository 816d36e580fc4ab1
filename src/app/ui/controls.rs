use eframe::egui::{self, Color32, RichText, TextEdit, Ui};

use flex_view::analysis::{HistoryOutcome, RequestState, SubmitOutcome};

use super::super::ViewModel;

const ERROR_TEXT: Color32 = Color32::from_rgb(240, 110, 110);

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Analysis");
        ui.add_space(6.0);

        ui.label("Code");
        egui::ScrollArea::vertical()
            .id_salt("code_editor_scroll")
            .max_height(360.0)
            .show(ui, |ui| {
                ui.add(
                    TextEdit::multiline(&mut self.code)
                        .code_editor()
                        .desired_rows(16)
                        .desired_width(f32::INFINITY)
                        .hint_text("Paste the code to analyze"),
                );
            });

        ui.add_space(4.0);
        ui.label("Intent");
        ui.add(
            TextEdit::singleline(&mut self.intent)
                .desired_width(f32::INFINITY)
                .hint_text("What should this code do?"),
        );

        ui.add_space(6.0);
        let submitting = self.controller.state() == RequestState::Submitting;
        let can_submit = !submitting && !self.code.trim().is_empty();
        ui.horizontal(|ui| {
            if ui.add_enabled(can_submit, egui::Button::new("Analyze")).clicked()
                && let SubmitOutcome::Submitted(generation) =
                    self.controller.submit(self.code.clone(), self.intent.clone())
            {
                tracing::debug!(generation, "analysis submitted from the editor");
            }
            if submitting {
                ui.spinner();
                ui.label("Analyzing...");
            }
        });

        self.draw_request_status(ui);

        ui.separator();
        ui.label(RichText::new("Search nodes").strong());
        ui.text_edit_singleline(&mut self.search);

        ui.separator();
        self.draw_history(ui);
    }

    fn draw_request_status(&mut self, ui: &mut Ui) {
        match self.controller.state() {
            RequestState::Error => {
                let message = self
                    .controller
                    .last_error()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "analysis failed".to_owned());
                ui.add_space(4.0);
                ui.label(RichText::new(message).color(ERROR_TEXT));
                ui.horizontal(|ui| {
                    if ui.button("Retry").clicked() {
                        self.controller.retry();
                    }
                    if ui.button("Dismiss").clicked() {
                        self.controller.acknowledge();
                    }
                });
            }
            RequestState::Success => {
                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    ui.label("Analysis complete.");
                    if ui.small_button("OK").clicked() {
                        self.controller.acknowledge();
                    }
                });
            }
            RequestState::Idle | RequestState::Submitting => {}
        }

        let issues = self.controller.graph_issues();
        if !issues.is_empty() {
            ui.add_space(4.0);
            ui.collapsing(format!("{} edge(s) dropped", issues.len()), |ui| {
                for issue in issues {
                    ui.small(issue.to_string());
                }
            });
        }
    }

    fn draw_history(&self, ui: &mut Ui) {
        ui.label(RichText::new("History").strong());

        let mut history = self.controller.history().rev().peekable();
        if history.peek().is_none() {
            ui.label("No analyses yet.");
            return;
        }

        egui::ScrollArea::vertical()
            .id_salt("history_scroll")
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for entry in history {
                    let outcome = match &entry.outcome {
                        HistoryOutcome::Succeeded { nodes, faulty } => {
                            RichText::new(format!("{nodes} nodes, {faulty} faulty"))
                        }
                        HistoryOutcome::Failed(message) => {
                            RichText::new(format!("failed: {message}")).color(ERROR_TEXT)
                        }
                    };
                    ui.horizontal_wrapped(|ui| {
                        ui.label(RichText::new(format!("#{}", entry.generation)).monospace());
                        ui.label(entry.code_preview.as_str());
                    });
                    if !entry.intent.is_empty() {
                        ui.small(entry.intent.as_str());
                    }
                    ui.label(outcome);
                    ui.add_space(4.0);
                }
            });
    }
}
