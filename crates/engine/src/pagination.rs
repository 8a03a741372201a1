//! Producers of one page of rule groups. Which strategy runs depends on the
//! rule store that is wired in: a store that can page by group drives the
//! cursor itself, a plain store is scanned client-side.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::filter::PostFilter;
use crate::grouping::{group_rules, RuleBucket};
use crate::precedence::{add_totals, Totals};
use crate::projector::GroupProjector;
use crate::source::{GroupCursorLister, ListRulesByGroupQuery, ListRulesQuery, RuleLister, SourceError};
use crate::token::ContinuationToken;
use crate::wire::ProjectedRuleGroup;

/// Projection followed by the post-filters, shared by both strategies.
pub struct Assembler<'a> {
    pub projector: GroupProjector<'a>,
    pub post: PostFilter<'a>,
}

impl Assembler<'_> {
    pub fn assemble(&self, bucket: &RuleBucket) -> ProjectedRuleGroup {
        let mut group = self.projector.project(bucket);
        self.post.apply(&mut group);
        group
    }
}

pub struct PageRequest<'a> {
    pub query: &'a ListRulesQuery,
    pub rule_names: &'a HashSet<String>,
    /// Visible namespace uid to folder display path.
    pub namespaces: &'a HashMap<String, String>,
    pub group_limit: i64,
    pub rule_limit: i64,
    pub token: &'a str,
}

#[derive(Debug, Default)]
pub struct Page {
    pub groups: Vec<ProjectedRuleGroup>,
    /// Pre-filter totals of every group assembled for this page.
    pub totals: Totals,
    pub next_token: String,
}

#[async_trait]
pub trait GroupPager: Send + Sync {
    async fn page(&self, req: &PageRequest<'_>, assembler: &Assembler<'_>) -> Result<Page, SourceError>;

    /// Whether `req` asks for a bounded page, in which case envelope totals
    /// are withheld.
    fn paginates(&self, req: &PageRequest<'_>) -> bool;
}

/// Fetches every visible rule and scans the sorted buckets, resuming after
/// a [`ContinuationToken`] it issued earlier. Only `group_limit` bounds a
/// page; `rule_limit` is ignored.
pub struct ScanPager<S> {
    store: S,
}

impl<S: RuleLister> ScanPager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: RuleLister> GroupPager for ScanPager<S> {
    async fn page(&self, req: &PageRequest<'_>, assembler: &Assembler<'_>) -> Result<Page, SourceError> {
        if req.group_limit == 0 {
            return Ok(Page::default());
        }
        let rules = self.store.list_rules(req.query).await?;
        tracing::debug!(rules = rules.len(), "alert rules retrieved from store");

        let resume = ContinuationToken::parse(req.token);
        if resume.is_none() && !req.token.is_empty() {
            tracing::debug!("ignoring undecodable continuation token");
        }

        let buckets = group_rules(rules, req.rule_names, req.namespaces);
        let mut page = Page::default();
        let mut seeking = resume.is_some();

        for bucket in &buckets {
            let token = bucket.token();
            if seeking {
                if let Some(resume) = &resume {
                    if token < *resume {
                        continue;
                    }
                }
                seeking = false;
            }

            if req.group_limit > -1 && page.groups.len() as i64 == req.group_limit {
                page.next_token = token.into_string();
                break;
            }

            let group = assembler.assemble(bucket);
            add_totals(&mut page.totals, &group.totals);
            if !group.rules.is_empty() {
                page.groups.push(group);
            }
        }

        Ok(page)
    }

    fn paginates(&self, req: &PageRequest<'_>) -> bool {
        req.group_limit > -1
    }
}

/// Lets the store page by group and keeps fetching while post-filters
/// leave the page short of its limits.
pub struct CursorPager<S> {
    store: S,
}

impl<S: GroupCursorLister> CursorPager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

fn remaining(limit: i64, used: i64) -> Option<i64> {
    if limit > 0 {
        let left = limit - used;
        (left > 0).then_some(left)
    } else {
        Some(limit)
    }
}

#[async_trait]
impl<S: GroupCursorLister> GroupPager for CursorPager<S> {
    async fn page(&self, req: &PageRequest<'_>, assembler: &Assembler<'_>) -> Result<Page, SourceError> {
        let mut page = Page::default();
        if req.group_limit == 0 || req.rule_limit == 0 {
            return Ok(page);
        }
        let mut token = req.token.to_string();
        let mut groups_returned = 0i64;
        let mut rules_returned = 0i64;

        loop {
            let (Some(group_limit), Some(rule_limit)) = (
                remaining(req.group_limit, groups_returned),
                remaining(req.rule_limit, rules_returned),
            ) else {
                page.next_token = token;
                return Ok(page);
            };

            let query = ListRulesByGroupQuery {
                query: req.query.clone(),
                group_limit,
                rule_limit,
                continue_token: token.clone(),
            };
            let (rules, next) = self.store.list_rules_by_group(&query).await?;
            tracing::debug!(
                rules = rules.len(),
                continue_token_set = !next.is_empty(),
                "alert rules page retrieved from store"
            );

            for bucket in &group_rules(rules, req.rule_names, req.namespaces) {
                let group = assembler.assemble(bucket);
                add_totals(&mut page.totals, &group.totals);
                if group.rules.is_empty() {
                    continue;
                }

                groups_returned += 1;
                rules_returned += group.rules.len() as i64;
                page.groups.push(group);

                let groups_full = req.group_limit > 0 && groups_returned == req.group_limit;
                let rules_full = req.rule_limit > 0 && rules_returned >= req.rule_limit;
                if groups_full || rules_full {
                    page.next_token = next;
                    return Ok(page);
                }
            }

            if next.is_empty() {
                return Ok(page);
            }
            if next == token {
                tracing::warn!(token = %next, "store returned the same continuation token, stopping");
                page.next_token = next;
                return Ok(page);
            }
            token = next;
        }
    }

    fn paginates(&self, req: &PageRequest<'_>) -> bool {
        req.group_limit > -1 || req.rule_limit > -1
    }
}
