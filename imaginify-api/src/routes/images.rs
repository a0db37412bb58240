/// Public image gallery
///
/// ```text
/// GET /api/images?page=2&limit=9&search_query=cat
/// ```
///
/// Every parameter is optional. A non-empty `search_query` is resolved
/// through the CDN search first; `saved_images` always counts every stored
/// image.
///
/// ```json
/// { "data": [ ... ], "total_pages": 3, "saved_images": 42 }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Json,
};
use imaginify_shared::assets::{get_all_images, AllImages, AllImagesQuery};

pub async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<AllImagesQuery>,
) -> ApiResult<Json<AllImages>> {
    let pool = state.db.connect().await?;
    let images = get_all_images(pool, state.assets.as_ref(), query).await?;

    Ok(Json(images))
}
