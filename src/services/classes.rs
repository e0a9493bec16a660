use anyhow::Context;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::domain::clone::{ClassGroup, ElementSample, SAMPLES_PER_CLASS, TOP_CLASS_LIMIT};

/// Fetches raw markup over plain HTTP and ranks its CSS classes. Independent
/// of the browser; the page is fetched a second time here.
#[derive(Clone)]
pub struct ClassExtractor {
    http: reqwest::Client,
}

impl ClassExtractor {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building page fetch client")?;
        Ok(Self { http })
    }

    pub async fn top_classes(&self, url: &str) -> anyhow::Result<Vec<ClassGroup>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("fetching {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            // the body is still ranked; the browser may have been let through
            tracing::warn!(%url, %status, "page fetch returned non-success status");
        }
        let body = resp.text().await.context("reading page body")?;

        let groups = rank_classes(&body, TOP_CLASS_LIMIT);
        tracing::debug!(%url, classes = groups.len(), "classes ranked");
        Ok(groups)
    }
}

/// Groups every element by each class it carries and returns the `limit`
/// most used classes. Equal counts keep first-seen document order. A token
/// repeated inside one `class` attribute (`class="btn btn"`) counts once.
pub fn rank_classes(html: &str, limit: usize) -> Vec<ClassGroup> {
    let document = Html::parse_document(html);
    let Ok(with_class) = Selector::parse("[class]") else {
        return Vec::new();
    };

    let mut groups: Vec<ClassGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for element in document.select(&with_class) {
        let node = element.value();
        let mut seen_here: Vec<&str> = Vec::new();
        for class in node.attr("class").unwrap_or_default().split_whitespace() {
            if seen_here.contains(&class) {
                continue;
            }
            seen_here.push(class);

            let slot = *index.entry(class.to_string()).or_insert_with(|| {
                groups.push(ClassGroup { class_name: class.to_string(), occurrence_count: 0, samples: Vec::new() });
                groups.len() - 1
            });
            let group = &mut groups[slot];
            group.occurrence_count += 1;
            if group.samples.len() < SAMPLES_PER_CLASS {
                group.samples.push(ElementSample {
                    tag: node.name().to_string(),
                    attributes: node.attrs().map(|(k, v)| (k.to_string(), v.to_string())).collect::<BTreeMap<_, _>>(),
                    text: element.text().map(str::trim).filter(|t| !t.is_empty()).collect(),
                });
            }
        }
    }

    groups.sort_by(|a, b| b.occurrence_count.cmp(&a.occurrence_count));
    groups.truncate(limit);
    groups
}
