//! Identifier-to-destination resolution.
//!
//! The resolver keeps at most one cached [`Link`] per id for the whole run.
//! Links themselves live in the store's arena; the cache maps ids to
//! handles. Passthrough links (absolute URLs, `mailto:`/`man:` targets and
//! bare anchors) are never cached.

use std::collections::HashMap;

use metrics::counter;
use tracing::trace;
use url::Url;

use crate::{
    application::store::{StoreError, SymbolStore},
    domain::links::{Link, LinkId},
};

const PASSTHROUGH_SCHEMES: [&str; 2] = ["man", "mailto"];

/// Lazily produces links for identifiers the store does not know.
pub trait LinkProvider {
    fn resolve(&self, name: &str) -> Option<Link>;
}

impl<F> LinkProvider for F
where
    F: Fn(&str) -> Option<Link>,
{
    fn resolve(&self, name: &str) -> Option<Link> {
        self(name)
    }
}

/// Overrides the display title of a link, e.g. for language-specific naming.
pub trait TitleProvider {
    fn title(&self, link: &Link) -> Option<String>;
}

/// Overrides the destination of a link.
pub trait DestinationProvider {
    fn destination(&self, link: &Link) -> Option<String>;
}

/// Rewrites a destination relative to the page currently being rendered.
pub trait Relativizer {
    fn relativize(&self, reference: &str) -> Option<String>;
}

/// Result of a named lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedLink {
    Stored(LinkId),
    Passthrough(Link),
}

#[derive(Default)]
pub struct LinkResolver {
    cache: HashMap<String, LinkId>,
    providers: Vec<Box<dyn LinkProvider>>,
    title_providers: Vec<Box<dyn TitleProvider>>,
    destination_providers: Vec<Box<dyn DestinationProvider>>,
    relativizer: Option<Box<dyn Relativizer>>,
}

impl std::fmt::Debug for LinkResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkResolver")
            .field("cached", &self.cache.len())
            .field("providers", &self.providers.len())
            .field("title_providers", &self.title_providers.len())
            .field("destination_providers", &self.destination_providers.len())
            .finish_non_exhaustive()
    }
}

impl LinkResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Box<dyn LinkProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_title_provider(mut self, provider: Box<dyn TitleProvider>) -> Self {
        self.title_providers.push(provider);
        self
    }

    pub fn with_destination_provider(mut self, provider: Box<dyn DestinationProvider>) -> Self {
        self.destination_providers.push(provider);
        self
    }

    /// Install (or clear) the relativization hook for the page being rendered.
    pub fn set_relativizer(&mut self, relativizer: Option<Box<dyn Relativizer>>) {
        self.relativizer = relativizer;
    }

    pub fn cached(&self, id: &str) -> Option<LinkId> {
        self.cache.get(id).copied()
    }

    /// Resolve `name` to a link; first success wins.
    ///
    /// A trailing `s` is stripped and the lookup retried once, so `cats` can
    /// find `cat`. That is a best-effort heuristic and stays silent when it
    /// misses.
    pub fn get_named_link(
        &mut self,
        store: &mut SymbolStore,
        name: &str,
    ) -> Result<Option<NamedLink>, StoreError> {
        self.lookup(store, name, false)
    }

    fn lookup(
        &mut self,
        store: &mut SymbolStore,
        name: &str,
        retried: bool,
    ) -> Result<Option<NamedLink>, StoreError> {
        let parsed = Url::parse(name).ok();
        if parsed.as_ref().is_some_and(|url| url.host().is_some()) {
            return Ok(Some(NamedLink::Passthrough(Link::passthrough(name))));
        }

        if let Some(id) = self.cached(name) {
            counter!("docweave_link_cache_hit_total").increment(1);
            return Ok(Some(NamedLink::Stored(id)));
        }
        counter!("docweave_link_cache_miss_total").increment(1);

        if let Some(symbol) = store.get_symbol(name)?
            && let Some(id) = store.symbol(symbol).link
        {
            self.cache.insert(name.to_string(), id);
            return Ok(Some(NamedLink::Stored(id)));
        }

        if let Some(mut link) = self.providers.iter().find_map(|p| p.resolve(name)) {
            link.id = name.to_string();
            let id = store.add_link(link);
            self.cache.insert(name.to_string(), id);
            trace!(name, "link resolved by provider");
            return Ok(Some(NamedLink::Stored(id)));
        }

        if parsed
            .as_ref()
            .is_some_and(|url| PASSTHROUGH_SCHEMES.contains(&url.scheme()))
        {
            return Ok(Some(NamedLink::Passthrough(Link::passthrough(name))));
        }

        if is_bare_fragment(name) {
            return Ok(Some(NamedLink::Passthrough(Link::passthrough(name))));
        }

        if !retried && let Some(singular) = name.strip_suffix('s') {
            counter!("docweave_link_plural_retry_total").increment(1);
            return self.lookup(store, singular, true);
        }

        Ok(None)
    }

    /// Register `link` under its id unless an entry already exists.
    pub fn add_link(&mut self, store: &mut SymbolStore, link: Link) -> LinkId {
        if let Some(id) = self.cached(&link.id) {
            return id;
        }
        let key = link.id.clone();
        let id = store.add_link(link);
        self.cache.insert(key, id);
        id
    }

    /// Merge `link` into the cache.
    ///
    /// An existing entry keeps its destination unless it has none, or
    /// `overwrite_ref` is set and the incoming link carries one; an explicit
    /// incoming title always replaces the stored one. Without an entry and
    /// without `overwrite_ref`, a link already owned by the symbol of that
    /// id is adopted.
    pub fn upsert(
        &mut self,
        store: &mut SymbolStore,
        link: Link,
        overwrite_ref: bool,
    ) -> Result<LinkId, StoreError> {
        if let Some(id) = self.cached(&link.id) {
            let existing = store.link_mut(id);
            if existing.reference.is_none() || (overwrite_ref && link.reference.is_some()) {
                existing.reference = link.reference;
            }
            if link.title.is_some() {
                existing.title = link.title;
            }
            return Ok(id);
        }

        if !overwrite_ref
            && let Some(symbol) = store.get_symbol(&link.id)?
            && let Some(id) = store.symbol(symbol).link
        {
            self.cache.insert(link.id, id);
            return Ok(id);
        }

        Ok(self.add_link(store, link))
    }

    /// Borrow the link behind a lookup result.
    pub fn link<'a>(&self, store: &'a SymbolStore, named: &'a NamedLink) -> &'a Link {
        match named {
            NamedLink::Stored(id) => store.link(*id),
            NamedLink::Passthrough(link) => link,
        }
    }

    /// Display title: the first title provider with an answer, else the
    /// stored title.
    pub fn title(&self, link: &Link) -> Option<String> {
        self.title_providers
            .iter()
            .find_map(|provider| provider.title(link))
            .or_else(|| link.title.clone())
    }

    /// Destination: the first destination provider with an answer, else the
    /// stored reference, passed through the relativization hook.
    pub fn destination(&self, link: &Link) -> Option<String> {
        let resolved = self
            .destination_providers
            .iter()
            .find_map(|provider| provider.destination(link))
            .or_else(|| link.reference.clone())?;

        match &self.relativizer {
            Some(hook) => Some(hook.relativize(&resolved).unwrap_or(resolved)),
            None => Some(resolved),
        }
    }
}

fn is_bare_fragment(name: &str) -> bool {
    name.strip_prefix('#').is_some_and(|fragment| !fragment.is_empty())
}

/// Relativizes output-root paths against the directory of one page.
#[derive(Debug, Clone)]
pub struct PageRelativizer {
    page_dir: Vec<String>,
}

impl PageRelativizer {
    /// `page_reference` is the page's own output-root relative path.
    pub fn new(page_reference: &str) -> Self {
        let mut components: Vec<String> = page_reference
            .split('/')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        components.pop();
        Self {
            page_dir: components,
        }
    }
}

impl Relativizer for PageRelativizer {
    fn relativize(&self, reference: &str) -> Option<String> {
        if reference.starts_with('#') || Url::parse(reference).is_ok() {
            return None;
        }

        let (path, fragment) = match reference.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (reference, None),
        };
        let target: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
        let common = self
            .page_dir
            .iter()
            .zip(target.iter())
            .take_while(|(a, b)| a.as_str() == **b)
            .count();

        let mut parts: Vec<&str> = Vec::new();
        parts.extend(std::iter::repeat_n("..", self.page_dir.len() - common));
        parts.extend(target[common..].iter().copied());

        let mut relative = parts.join("/");
        if let Some(fragment) = fragment {
            relative.push('#');
            relative.push_str(fragment);
        }
        Some(relative)
    }
}
