//! services/api/src/web/summary_task.rs
//!
//! The background task that folds a freshly generated page into the book's
//! rolling summary. It runs after the page response has been sent, so its
//! failures are logged and counted but never reach the client.

use crate::web::state::AppState;
use saga_core::{
    domain::{Page, RollingSummary},
    ports::PortResult,
    prompt::build_summary_prompt,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Spawns the summary update for `page` and returns its handle. Dropping the
/// handle detaches the task.
pub fn spawn_summary_update(
    app_state: Arc<AppState>,
    user_id: String,
    existing: Option<RollingSummary>,
    page: Page,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match update_rolling_summary(&app_state, &user_id, existing.as_ref(), &page).await {
            Ok(Some(summary)) => info!(
                "Rolling summary of book {} now covers page {}.",
                summary.book_id, summary.last_page_index
            ),
            Ok(None) => {}
            Err(e) => {
                app_state.record_summary_failure();
                error!(
                    "Failed to update the rolling summary of book {} after page {}: {}",
                    page.book_id, page.order_index, e
                );
            }
        }
    })
}

/// Asks the summary model for a new rolling summary and stores it, replacing
/// the previous one.
///
/// Returns `None` without writing when a later page's summary was stored while
/// the model was working.
pub async fn update_rolling_summary(
    app_state: &AppState,
    user_id: &str,
    existing: Option<&RollingSummary>,
    page: &Page,
) -> PortResult<Option<RollingSummary>> {
    let start_time = Instant::now();
    let prompt = build_summary_prompt(
        existing.map(|s| s.rolling_summary.as_str()),
        &page.content,
        page.order_index,
    );
    let text = app_state.summary_model.generate(&prompt).await?;

    let stored = app_state.repo.get_summary(user_id, &page.book_id).await?;
    if let Some(stored) = stored.filter(|s| s.last_page_index > page.order_index) {
        warn!(
            "Skipping summary for page {} of book {}: page {} is already summarized.",
            page.order_index, page.book_id, stored.last_page_index
        );
        return Ok(None);
    }

    let summary = RollingSummary {
        book_id: page.book_id.clone(),
        rolling_summary: text,
        last_page_index: page.order_index,
    };
    app_state.repo.put_summary(user_id, &summary).await?;
    info!("⏱️ Summary update took: {:?}", start_time.elapsed());

    Ok(Some(summary))
}
