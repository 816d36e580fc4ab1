use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, StrokeKind, Ui, vec2};

use flex_view::graph::GraphNode;
use flex_view::util::{search_labels, truncate_chars};

use super::super::render_utils::{
    FAULT_BORDER, SELECTED, SearchState, border_point, draw_arrow, draw_background, node_border,
    node_fill, world_to_screen,
};
use super::super::{SearchMatchCache, ViewModel};

impl ViewModel {
    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<String>>> {
        let search_query = self.search.trim();
        if search_query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.graph_revision == self.graph_revision
            && cached.query == search_query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let graph = self.controller.graph()?;
        let matches = Arc::new(
            search_labels(graph, search_query)
                .into_iter()
                .collect::<HashSet<_>>(),
        );

        self.search_match_cache = Some(SearchMatchCache {
            query: search_query.to_owned(),
            graph_revision: self.graph_revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    fn canvas_message(&self) -> Option<&'static str> {
        match self.controller.graph() {
            None => Some("Submit code to see its execution graph."),
            Some(graph) if !graph.is_laid_out() => Some("Laying out graph..."),
            Some(graph) if graph.is_empty() => Some("The analysis returned no nodes."),
            Some(_) => None,
        }
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);

        if let Some(message) = self.canvas_message() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                message,
                FontId::proportional(15.0),
                Color32::from_gray(170),
            );
            return;
        }

        if self.fit_requested {
            self.fit_graph(rect);
            self.fit_requested = false;
        }
        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);

        let search_matches = self.cached_search_matches();
        let pan = self.pan;
        let zoom = self.zoom;
        let zoom_sqrt = zoom.sqrt();
        let node_size = vec2(self.layout.node_width, self.layout.node_height) * zoom;
        let corner_radius = 8.0 * zoom;

        let Some(graph) = self.controller.graph() else {
            return;
        };
        let selected_id = self.controller.selected_node().map(|node| node.id.as_str());

        let (nodes, node_rects): (Vec<&GraphNode>, Vec<Rect>) = graph
            .nodes()
            .filter_map(|node| {
                let center = world_to_screen(rect, pan, zoom, node.position()?);
                Some((node, Rect::from_center_size(center, node_size)))
            })
            .unzip();
        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.as_str(), index))
            .collect::<HashMap<_, _>>();

        let hovered = Self::hovered_index(ui, &node_rects);
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let pending_selection = if response.clicked_by(egui::PointerButton::Primary) {
            Some(hovered.map(|index| nodes[index].id.clone()))
        } else {
            None
        };

        let tip_length = (9.0 * zoom_sqrt).clamp(4.0, 14.0);
        for edge in graph.edges() {
            let (Some(&source), Some(&target)) = (
                index_by_id.get(edge.source.as_str()),
                index_by_id.get(edge.target.as_str()),
            ) else {
                continue;
            };

            let touches_selection = selected_id
                .is_some_and(|selected| selected == edge.source || selected == edge.target);
            let stroke = if touches_selection {
                Stroke::new((2.2 * zoom_sqrt).clamp(1.2, 4.0), SELECTED)
            } else {
                Stroke::new(
                    (1.2 * zoom_sqrt).clamp(0.6, 3.0),
                    Color32::from_rgba_unmultiplied(150, 160, 172, 200),
                )
            };

            let source_rect = node_rects[source];
            if edge.is_self_loop() {
                let loop_radius = (source_rect.height() * 0.35).max(4.0);
                let anchor = source_rect.right_center() + vec2(loop_radius, 0.0);
                painter.circle_stroke(anchor, loop_radius, stroke);
                continue;
            }

            let target_rect = node_rects[target];
            if !rect.intersects(source_rect.union(target_rect)) {
                continue;
            }
            let start = border_point(source_rect, target_rect.center());
            let end = border_point(target_rect, source_rect.center());
            draw_arrow(&painter, start, end, stroke, tip_length);
        }

        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());
        let font_size = (13.0 * zoom).clamp(7.0, 22.0);
        let label_chars = ((self.layout.node_width / 7.5) as usize).max(4);

        for (index, (node, node_rect)) in nodes.iter().zip(&node_rects).enumerate() {
            if !rect.intersects(*node_rect) {
                continue;
            }

            let is_selected = selected_id == Some(node.id.as_str());
            let is_hovered = hovered == Some(index);
            let is_search_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&node.id));

            let search = if is_search_match {
                SearchState::Match
            } else if search_active {
                SearchState::Miss
            } else {
                SearchState::Inactive
            };
            let fill = node_fill(node.is_faulty(), search, is_hovered);
            let border = node_border(node.is_faulty(), is_selected, search);

            painter.rect_filled(*node_rect, corner_radius, fill);
            painter.rect_stroke(*node_rect, corner_radius, border, StrokeKind::Inside);

            if node.is_faulty() {
                let badge = node_rect.right_top() + vec2(-10.0, 10.0) * zoom_sqrt;
                let badge_radius = (7.0 * zoom_sqrt).clamp(3.0, 10.0);
                painter.circle_filled(badge, badge_radius, FAULT_BORDER);
                painter.text(
                    badge,
                    Align2::CENTER_CENTER,
                    "!",
                    FontId::proportional(badge_radius * 1.5),
                    Color32::WHITE,
                );
            }

            if zoom > 0.3 {
                painter.text(
                    node_rect.center(),
                    Align2::CENTER_CENTER,
                    truncate_chars(&node.label, label_chars),
                    FontId::proportional(font_size),
                    Color32::from_gray(236),
                );
            }
        }

        if let Some(index) = hovered {
            let node = nodes[index];
            let mut panel_text = node.label.clone();
            if let Some(rank) = node.rank() {
                panel_text.push_str(&format!("  |  rank {rank}"));
            }
            if let Some(error) = &node.error {
                panel_text.push_str(&format!("  |  fault: {error}"));
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if let Some(selected) = pending_selection {
            self.apply_graph_selection(selected);
        }
    }
}
