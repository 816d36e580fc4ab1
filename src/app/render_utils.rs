use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

pub(super) const FAULT_BORDER: Color32 = Color32::from_rgb(232, 72, 72);
pub(super) const FAULT_FILL: Color32 = Color32::from_rgb(112, 40, 52);
pub(super) const NODE_FILL: Color32 = Color32::from_rgb(44, 62, 80);
pub(super) const NODE_BORDER: Color32 = Color32::from_rgb(96, 116, 136);
pub(super) const SELECTED: Color32 = Color32::from_rgb(245, 206, 93);
pub(super) const SEARCH_MATCH: Color32 = Color32::from_rgb(103, 196, 255);

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum SearchState {
    Inactive,
    Match,
    Miss,
}

pub(super) fn node_fill(faulty: bool, search: SearchState, hovered: bool) -> Color32 {
    let base = if faulty { FAULT_FILL } else { NODE_FILL };
    let fill = match search {
        SearchState::Inactive => base,
        SearchState::Match => blend_color(base, SEARCH_MATCH, 0.45),
        SearchState::Miss => dim_color(base, 0.45),
    };
    if hovered {
        blend_color(fill, Color32::WHITE, 0.12)
    } else {
        fill
    }
}

pub(super) fn node_border(faulty: bool, selected: bool, search: SearchState) -> Stroke {
    if selected {
        Stroke::new(2.6, SELECTED)
    } else if faulty {
        Stroke::new(2.0, FAULT_BORDER)
    } else if search == SearchState::Match {
        Stroke::new(1.6, SEARCH_MATCH)
    } else {
        Stroke::new(1.0, NODE_BORDER)
    }
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

pub(super) fn border_point(rect: Rect, toward: Pos2) -> Pos2 {
    let center = rect.center();
    let direction = toward - center;
    if direction.x.abs() <= f32::EPSILON && direction.y.abs() <= f32::EPSILON {
        return center;
    }

    let half = rect.size() / 2.0;
    let scale_x = if direction.x.abs() > f32::EPSILON {
        half.x / direction.x.abs()
    } else {
        f32::INFINITY
    };
    let scale_y = if direction.y.abs() > f32::EPSILON {
        half.y / direction.y.abs()
    } else {
        f32::INFINITY
    };
    center + direction * scale_x.min(scale_y).min(1.0)
}

pub(super) fn draw_arrow(painter: &Painter, start: Pos2, end: Pos2, stroke: Stroke, tip_length: f32) {
    painter.line_segment([start, end], stroke);

    let direction = end - start;
    if direction.length_sq() <= f32::EPSILON {
        return;
    }
    let back = -direction.normalized() * tip_length;
    let side = back.rot90() * 0.5;
    painter.line_segment([end, end + back + side], stroke);
    painter.line_segment([end, end + back - side], stroke);
}

pub(super) fn fit_transform(rect: Rect, bounds: Rect, margin: f32) -> (Vec2, f32) {
    let available = (rect.size() - Vec2::splat(margin * 2.0)).max(Vec2::splat(1.0));
    let size = bounds.size().max(Vec2::splat(1.0));
    let zoom = (available.x / size.x).min(available.y / size.y).clamp(0.05, 1.5);
    let pan = -bounds.center().to_vec2() * zoom;
    (pan, zoom)
}
