use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{Context, Vec2};

use flex_view::analysis::AnalysisController;
use flex_view::client::HttpBackend;
use flex_view::config::LayoutConfig;
use flex_view::dispatch::ThreadDispatch;

mod graph;
mod render_utils;
mod ui;

pub struct FlexApp {
    model: ViewModel,
}

struct ViewModel {
    controller: AnalysisController,
    layout: LayoutConfig,
    code: String,
    intent: String,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    pan: Vec2,
    zoom: f32,
    fit_requested: bool,
    was_layout_pending: bool,
    graph_revision: u64,
}

struct SearchMatchCache {
    query: String,
    graph_revision: u64,
    matches: Arc<HashSet<String>>,
}

impl FlexApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        backend: Arc<HttpBackend>,
        layout: LayoutConfig,
    ) -> Self {
        let ctx = cc.egui_ctx.clone();
        let dispatch = Arc::new(ThreadDispatch::with_waker(move || ctx.request_repaint()));
        let controller = AnalysisController::new(backend.clone(), backend, dispatch, layout);

        Self {
            model: ViewModel::new(controller, layout),
        }
    }
}

impl ViewModel {
    fn new(controller: AnalysisController, layout: LayoutConfig) -> Self {
        Self {
            controller,
            layout,
            code: String::new(),
            intent: String::new(),
            search: String::new(),
            search_match_cache: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            fit_requested: false,
            was_layout_pending: false,
            graph_revision: 0,
        }
    }

    fn sync_with_controller(&mut self) {
        if self.controller.poll() {
            self.graph_revision += 1;
        }

        let layout_pending = self.controller.is_layout_pending();
        if self.was_layout_pending && !layout_pending {
            self.fit_requested = true;
        }
        self.was_layout_pending = layout_pending;
    }
}

impl eframe::App for FlexApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.model.sync_with_controller();
        self.model.show(ctx);
    }
}
