use std::{collections::HashSet, iter, time::Duration};

use anyhow::{Context, Result};
use dom_query::{Document, NodeRef};
use reqwest::Client;
use tokio::{
    sync::mpsc::UnboundedSender,
    task::JoinHandle,
    time::sleep,
};
use url::Url;

use crate::{
    domain::{Candidate, ImageElement},
    infrastructure::shutdown::ShutdownListener,
};

use super::document::{DomNode, MutationBatch, MutationRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub src: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Headless stand-in for a live tab: polls a page and reports images that
/// appeared since the previous fetch as a mutation batch.
pub struct HtmlPageSource {
    client: Client,
    url: Url,
    poll_interval: Duration,
    known: HashSet<String>,
}

impl HtmlPageSource {
    pub fn new(client: Client, url: Url, poll_interval: Duration) -> Self {
        Self {
            client,
            url,
            poll_interval,
            known: HashSet::new(),
        }
    }

    /// Fetches the page once and returns it as the initial document.
    pub async fn load(&mut self) -> Result<DomNode> {
        let images = self.fetch_new_images().await?;
        tracing::info!(
            target: "watcher",
            url = %self.url,
            images = images.len(),
            "page loaded"
        );
        Ok(DomNode::element(
            "body",
            images.into_iter().map(DomNode::Image).collect(),
        ))
    }

    pub async fn poll(&mut self) -> Result<Option<MutationBatch>> {
        let images = self.fetch_new_images().await?;
        if images.is_empty() {
            return Ok(None);
        }
        let inserted = DomNode::element("div", images.into_iter().map(DomNode::Image).collect());
        Ok(Some(vec![MutationRecord {
            added_nodes: vec![inserted],
        }]))
    }

    pub fn spawn(
        mut self,
        mutations: UnboundedSender<MutationBatch>,
        mut shutdown: ShutdownListener,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sleep(self.poll_interval) => {}
                    _ = shutdown.notified() => break,
                }
                match self.poll().await {
                    Ok(Some(batch)) => {
                        if mutations.send(batch).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(target: "watcher", url = %self.url, error = %err, "page poll failed");
                    }
                }
            }
            tracing::debug!(target: "watcher", "page poller stopped");
        })
    }

    async fn fetch_new_images(&mut self) -> Result<Vec<Candidate>> {
        let body = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("failed to fetch {}", self.url))?
            .error_for_status()?
            .text()
            .await?;

        let fresh = extract_images(&body, &self.url)
            .into_iter()
            .filter(|img| self.known.insert(img.src.clone()))
            .map(|img| ImageElement::with_dimensions(img.src, img.width, img.height))
            .collect();
        Ok(fresh)
    }
}

/// Every `<img>` the parsed page would render, in document order. Markup in
/// comments, scripts, `<noscript>` and `<template>` is not part of the tree.
pub fn extract_images(html: &str, base: &Url) -> Vec<ImageRef> {
    let document = Document::from(html);
    let selection = document.select("img");
    selection
        .nodes()
        .iter()
        .filter(|node| !is_inert(node))
        .filter_map(|node| image_ref(node, base))
        .collect()
}

fn is_inert(node: &NodeRef) -> bool {
    iter::successors(node.parent(), |parent| parent.parent())
        .filter_map(|ancestor| ancestor.node_name())
        .any(|name| matches!(&*name, "noscript" | "template" | "script"))
}

fn image_ref(node: &NodeRef, base: &Url) -> Option<ImageRef> {
    let src = node.attr("src")?;
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    let resolved = base.join(src).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    Some(ImageRef {
        src: resolved.to_string(),
        width: node.attr("width").and_then(|value| parse_dimension(&value)),
        height: node.attr("height").and_then(|value| parse_dimension(&value)),
    })
}

/// Pixel value of a `width`/`height` attribute. Percentages and other units
/// say nothing about the rendered size and come back as unknown.
fn parse_dimension(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits_end = value
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(digits_end);
    if !unit.trim().is_empty() && !unit.trim().eq_ignore_ascii_case("px") {
        return None;
    }
    digits.parse().ok()
}
