use eframe::egui::{self, Rect, Ui, vec2};

use super::super::ViewModel;
use super::super::render_utils::{fit_transform, screen_to_world};

const FIT_MARGIN: f32 = 40.0;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.05, 4.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Primary)
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    pub(in crate::app) fn hovered_index(ui: &Ui, node_rects: &[Rect]) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        node_rects.iter().rposition(|node_rect| node_rect.contains(pointer))
    }

    pub(in crate::app) fn fit_graph(&mut self, rect: Rect) {
        let Some(graph) = self.controller.graph() else {
            return;
        };

        let half = vec2(self.layout.node_width, self.layout.node_height) / 2.0;
        let bounds = graph
            .nodes()
            .filter_map(|node| node.position())
            .fold(Rect::NOTHING, |bounds, position| {
                bounds.union(Rect::from_min_max(
                    (position - half).to_pos2(),
                    (position + half).to_pos2(),
                ))
            });
        if !bounds.is_positive() {
            return;
        }

        let (pan, zoom) = fit_transform(rect, bounds, FIT_MARGIN);
        self.pan = pan;
        self.zoom = zoom;
    }

    pub(in crate::app) fn apply_graph_selection(&mut self, selected: Option<String>) {
        match selected {
            Some(node_id) => {
                self.controller.select_node(&node_id);
            }
            None => self.controller.clear_selection(),
        }
    }
}
