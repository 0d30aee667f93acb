//! Destination search tool.
//!
//! Answers from a small built-in catalogue; there is no backing service.

use rmcp::{
    handler::server::tool::schema_for_type,
    model::{CallToolResult, Content, Tool, ToolAnnotations},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::domains::tools::error::ToolError;
use crate::domains::tools::registry::ToolDefinition;

// ============================================================================
// Tool Parameters
// ============================================================================

/// Budget preference for a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BudgetLevel {
    Low,
    Medium,
    High,
    Luxury,
}

impl BudgetLevel {
    /// Daily cost band in USD, lower bound inclusive, upper bound exclusive.
    fn cost_band(self) -> (u32, u32) {
        match self {
            Self::Low => (0, 100),
            Self::Medium => (100, 220),
            Self::High => (220, 400),
            Self::Luxury => (400, u32::MAX),
        }
    }
}

/// Parameters for the destination search tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchDestinationsParams {
    /// The destination or type of vacation to search for (e.g., 'beaches in Italy').
    pub query: String,

    /// Budget preference.
    #[serde(default)]
    pub budget_level: Option<BudgetLevel>,
}

// ============================================================================
// Output Structure
// ============================================================================

/// A destination suggestion.
#[derive(Debug, Clone, Serialize)]
pub struct Destination {
    pub id: &'static str,
    pub name: &'static str,
    pub country: &'static str,
    pub description: &'static str,
    pub avg_cost_per_day: u32,
    pub image_url: &'static str,
}

const CATALOGUE: &[Destination] = &[
    Destination {
        id: "dest_001",
        name: "Amalfi Coast",
        country: "Italy",
        description: "Beautiful coastal area with dramatic cliffs.",
        avg_cost_per_day: 250,
        image_url: "https://example.com/amalfi.jpg",
    },
    Destination {
        id: "dest_002",
        name: "Santorini",
        country: "Greece",
        description: "Famous for white buildings and sunsets.",
        avg_cost_per_day: 200,
        image_url: "https://example.com/santorini.jpg",
    },
    Destination {
        id: "dest_003",
        name: "Bali",
        country: "Indonesia",
        description: "Tropical paradise with beaches and temples.",
        avg_cost_per_day: 80,
        image_url: "https://example.com/bali.jpg",
    },
    Destination {
        id: "dest_004",
        name: "Maldives",
        country: "Maldives",
        description: "Overwater villas on turquoise lagoons.",
        avg_cost_per_day: 650,
        image_url: "https://example.com/maldives.jpg",
    },
    Destination {
        id: "dest_005",
        name: "Lisbon",
        country: "Portugal",
        description: "Hilly city of trams, tiles and seafood.",
        avg_cost_per_day: 130,
        image_url: "https://example.com/lisbon.jpg",
    },
];

/// Filter the catalogue by budget and put entries matching the query first.
pub fn search(query: &str, budget: Option<BudgetLevel>) -> Vec<Destination> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| t.len() > 2)
        .collect();
    let matches = |d: &Destination| {
        let haystack = format!("{} {} {}", d.name, d.country, d.description).to_lowercase();
        terms.iter().any(|t| haystack.contains(t.as_str()))
    };

    let mut results: Vec<Destination> = CATALOGUE
        .iter()
        .filter(|d| {
            budget.is_none_or(|level| {
                let (min, max) = level.cost_band();
                (min..max).contains(&d.avg_cost_per_day)
            })
        })
        .cloned()
        .collect();
    results.sort_by_key(|d| !matches(d));
    results
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Destination search tool.
pub struct SearchDestinationsTool;

impl SearchDestinationsTool {
    pub const NAME: &'static str = "search_destinations";

    pub const DESCRIPTION: &'static str =
        "Search vacation destinations matching a query, optionally filtered by budget level.";

    #[instrument(skip_all, fields(query = %params.query))]
    pub async fn execute(params: SearchDestinationsParams) -> Result<CallToolResult, ToolError> {
        info!(
            "Searching destinations for '{}' (budget: {:?})",
            params.query, params.budget_level
        );

        let results = search(&params.query, params.budget_level);
        let text = serde_json::to_string_pretty(&results)
            .map_err(|e| ToolError::internal(e.to_string()))?;

        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<SearchDestinationsParams>().into(),
            annotations: Some(ToolAnnotations {
                title: Some("Search Destinations".into()),
                read_only_hint: Some(true),
                destructive_hint: None,
                idempotent_hint: None,
                open_world_hint: Some(true),
            }),
            output_schema: None,
            icons: None,
            meta: None,
            title: Some("Search Destinations".into()),
        }
    }

    pub fn definition() -> Result<ToolDefinition, ToolError> {
        ToolDefinition::new(Self::to_tool(), |params: SearchDestinationsParams| {
            Self::execute(params)
        })
    }
}
