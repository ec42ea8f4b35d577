use std::sync::Arc;

use checkmp_core::{MediaCandidate, MediaType, StatsSummary};
use checkmp_upstream::{MediaService, PopularFilter, UpstreamError};
use tracing::warn;

/// Hot-list query: upstream paging/filters plus an optional local language filter.
#[derive(Debug, Clone, Default)]
pub struct HotFilter {
    pub popular: PopularFilter,
    pub lang: Option<String>,
}

/// Read-only views over the upstream catalog and dashboard.
#[derive(Clone)]
pub struct Catalog {
    service: Arc<dyn MediaService>,
}

impl Catalog {
    pub fn new(service: Arc<dyn MediaService>) -> Self {
        Self { service }
    }

    pub async fn hot(
        &self,
        media_type: MediaType,
        filter: &HotFilter,
    ) -> Result<Vec<MediaCandidate>, UpstreamError> {
        let items = self.service.popular(media_type, &filter.popular).await?;
        let Some(codes) = filter.lang.as_deref().and_then(language_codes) else {
            return Ok(items);
        };

        Ok(items
            .into_iter()
            .filter(|item| {
                item.original_language
                    .as_deref()
                    .is_some_and(|l| codes.iter().any(|c| c.eq_ignore_ascii_case(l)))
            })
            .collect())
    }

    pub async fn search(
        &self,
        title: &str,
        page: u32,
        count: u32,
    ) -> Result<Vec<MediaCandidate>, UpstreamError> {
        self.service.search(title, page, count).await
    }

    /// Library counts are required; storage and downloader details are best effort.
    pub async fn stats(&self) -> Result<StatsSummary, UpstreamError> {
        let media = self.service.statistic().await?;
        let (storage, downloader) = tokio::join!(self.service.storage(), self.service.downloader());

        Ok(StatsSummary {
            media,
            storage: storage
                .inspect_err(|e| warn!(error = %e, "storage info unavailable"))
                .ok(),
            downloader: downloader
                .inspect_err(|e| warn!(error = %e, "downloader info unavailable"))
                .ok(),
        })
    }
}

/// TMDB `original_language` codes accepted for a user-supplied language filter.
///
/// Accepts ISO 639-1 codes and common Chinese names. Blank input means no filter.
pub fn language_codes(lang: &str) -> Option<Vec<String>> {
    let lang = lang.trim();
    if lang.is_empty() {
        return None;
    }
    let codes: &[&str] = match lang.to_lowercase().as_str() {
        "ko" | "韩语" | "韩国" | "韩剧" => &["ko"],
        "ja" | "日语" | "日本" | "日剧" => &["ja"],
        "zh" | "中文" | "国语" | "汉语" | "华语" => &["zh", "cn"],
        "cn" | "粤语" => &["cn"],
        "en" | "英语" | "英文" => &["en"],
        other => return Some(vec![other.to_string()]),
    };
    Some(codes.iter().map(|c| c.to_string()).collect())
}
