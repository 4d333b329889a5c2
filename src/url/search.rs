//! Search query construction
//!
//! A search is rendered to a URL whose parameters always appear in the same
//! order (`filters.workplaceTypes`, `location`, `q`). The query string of that
//! URL doubles as the query token stored on every record the search touches,
//! so two runs of the same logical search always tag with the same token.

use crate::QueryError;
use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;
use url::Url;

/// Country suffix appended to every location filter
const LOCATION_SUFFIX: &str = ", USA";

/// Workplace filter accepted by the listing site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkplaceType {
    Remote,
    Hybrid,
    Onsite,
}

impl WorkplaceType {
    /// The value the listing site expects in `filters.workplaceTypes`
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Remote => "Remote",
            Self::Hybrid => "Hybrid",
            Self::Onsite => "Onsite",
        }
    }
}

impl FromStr for WorkplaceType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "hybrid" => Ok(Self::Hybrid),
            "onsite" => Ok(Self::Onsite),
            _ => Err(QueryError::UnknownWorkplace(s.to_string())),
        }
    }
}

impl fmt::Display for WorkplaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_param())
    }
}

/// The parameters of one search run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    keyword: String,
    location: Option<String>,
    workplace: Option<WorkplaceType>,
}

impl SearchQuery {
    /// Creates a query; the keyword must contain something besides whitespace
    pub fn new(
        keyword: &str,
        location: Option<&str>,
        workplace: Option<WorkplaceType>,
    ) -> Result<Self, QueryError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(QueryError::EmptyKeyword);
        }

        Ok(Self {
            keyword: keyword.to_string(),
            location: location
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            workplace,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn workplace(&self) -> Option<WorkplaceType> {
        self.workplace
    }

    /// Returns the ordered, form-encoded parameters of this search
    ///
    /// This is the query token recorded in each record's `searches` list.
    ///
    /// # Examples
    ///
    /// ```
    /// use dice_harvest::url::{SearchQuery, WorkplaceType};
    ///
    /// let query = SearchQuery::new("software engineer", Some("New York, NY"), Some(WorkplaceType::Remote)).unwrap();
    /// assert_eq!(
    ///     query.token(),
    ///     "filters.workplaceTypes=Remote&location=New+York%2C+NY%2C+USA&q=software+engineer"
    /// );
    /// ```
    pub fn token(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        if let Some(workplace) = self.workplace {
            serializer.append_pair("filters.workplaceTypes", workplace.as_param());
        }

        if let Some(location) = &self.location {
            serializer.append_pair("location", &format!("{}{}", location, LOCATION_SUFFIX));
        }

        serializer.append_pair("q", &self.keyword);
        serializer.finish()
    }

    /// Builds the first results-page URL for this search on `base_url`
    pub fn search_url(&self, base_url: &str) -> Result<Url, QueryError> {
        let mut url = Url::parse(base_url).map_err(|e| QueryError::Parse(e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(QueryError::InvalidScheme(url.scheme().to_string()));
        }

        if url.host_str().is_none() {
            return Err(QueryError::MissingHost);
        }

        url.set_query(Some(&self.token()));
        Ok(url)
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Returns the URL of result page `page` (1-based) for a search URL
///
/// Page 1 is the search URL itself; later pages carry an extra `page`
/// parameter after the existing ones.
pub fn page_url(search_url: &Url, page: u32) -> Url {
    let mut url = search_url.clone();
    if page > 1 {
        url.query_pairs_mut()
            .append_pair("page", &page.to_string());
    }
    url
}

/// Extracts the query token from an already built search URL
///
/// Returns `None` for URLs without a query string.
pub fn token_from_url(search_url: &Url) -> Option<String> {
    search_url
        .query()
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}
