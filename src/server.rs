use crate::config::AppConfig;
use crate::render::{render_map, CellOutput, RenderOptions};
use crate::types::{City, PointRow, Region, Viewport};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use geo::bounding_rect::BoundingRect;
use geo::Coord;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

// Wrapper for RTree indexing
struct RegionEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub regions: Vec<Region>,
    pub cities: Vec<City>,
    pub options: RenderOptions,
    pub tree: RTree<RegionEnvelope>,
}

#[derive(Deserialize)]
pub struct RenderParams {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

#[derive(Serialize)]
pub struct RenderResponse {
    pub cells: Vec<CellOutput>,
    pub table: Vec<PointRow>,
}

pub async fn start_server(config: AppConfig, regions: Vec<Region>, cities: Vec<City>) -> Result<()> {
    println!("Building spatial index for {} regions...", regions.len());
    let tree_items: Vec<RegionEnvelope> = regions
        .iter()
        .enumerate()
        .filter_map(|(i, region)| {
            let rect = region.boundary.bounding_rect()?;
            Some(RegionEnvelope {
                index: i,
                aabb: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
            })
        })
        .collect();
    let tree = RTree::bulk_load(tree_items);
    println!("Spatial index built.");

    let state = Arc::new(AppState {
        regions,
        cities,
        options: config.render.to_options(),
        tree,
    });

    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    println!("Starting server on http://{}", addr);

    let app = Router::new()
        .route("/api/render", get(render_handler))
        .fallback_service(ServeDir::new("."))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn render_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RenderParams>,
) -> Result<Json<RenderResponse>, (StatusCode, String)> {
    let viewport = Viewport::new(
        Coord {
            x: params.left,
            y: params.top,
        },
        Coord {
            x: params.right,
            y: params.bottom,
        },
    );

    let envelope = AABB::from_corners(
        [
            params.left.min(params.right),
            params.top.min(params.bottom),
        ],
        [
            params.left.max(params.right),
            params.top.max(params.bottom),
        ],
    );

    // Prefilter through the R-tree, then restore input order so the cell
    // sequence stays deterministic for a given viewport.
    let mut indices: Vec<usize> = state
        .tree
        .locate_in_envelope_intersecting(&envelope)
        .map(|entry| entry.index)
        .collect();
    indices.sort_unstable();
    let candidates = indices.iter().filter_map(|&i| state.regions.get(i));

    let output = render_map(&viewport, candidates, &state.cities, &state.options)
        .map_err(|e| {
            tracing::warn!("render failed: {e}");
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        })?;

    Ok(Json(RenderResponse {
        cells: output.cells.iter().map(CellOutput::from).collect(),
        table: output.point_table,
    }))
}
