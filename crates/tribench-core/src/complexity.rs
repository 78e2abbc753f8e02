//! Advisory complexity heuristic for natural-language questions.
//! Purely local keyword matching; never gates routing, only annotates
//! benchmark entries.

use serde::{Deserialize, Serialize};

struct IndicatorSet {
    terms: &'static [&'static str],
    weight: u32,
}

const JOINS: IndicatorSet = IndicatorSet {
    terms: &[
        "compare", "between", "across", "versus", "vs", "relation", "related",
    ],
    weight: 2,
};

const AGGREGATION: IndicatorSet = IndicatorSet {
    terms: &[
        "average",
        "total",
        "sum",
        "count",
        "minimum",
        "maximum",
        "cheapest",
        "most expensive",
        "best",
    ],
    weight: 1,
};

const SORTING: IndicatorSet = IndicatorSet {
    terms: &[
        "order", "sort", "cheapest", "best", "highest", "lowest", "top", "bottom",
    ],
    weight: 1,
};

const FILTERING: IndicatorSet = IndicatorSet {
    terms: &["where", "with", "only", "just", "specific", "particular"],
    weight: 1,
};

const TABLE_ENTITIES: &[&str] = &[
    "product", "price", "discount", "platform", "category", "brand", "history",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryComplexity {
    pub requires_joins: bool,
    pub requires_aggregation: bool,
    pub requires_sorting: bool,
    pub requires_filtering: bool,
    pub estimated_tables: usize,
    pub score: u32,
}

pub fn analyze(question: &str) -> QueryComplexity {
    let q = question.to_lowercase();
    let hit = |set: &IndicatorSet| set.terms.iter().any(|t| q.contains(t));

    let requires_joins = hit(&JOINS);
    let requires_aggregation = hit(&AGGREGATION);
    let requires_sorting = hit(&SORTING);
    let requires_filtering = hit(&FILTERING);

    let mut score = 0;
    let mut estimated_tables = 0;
    if requires_joins {
        score += JOINS.weight;
        estimated_tables += 2;
    }
    if requires_aggregation {
        score += AGGREGATION.weight;
    }
    if requires_sorting {
        score += SORTING.weight;
    }
    if requires_filtering {
        score += FILTERING.weight;
    }

    estimated_tables += TABLE_ENTITIES.iter().filter(|e| q.contains(**e)).count();
    if estimated_tables == 0 {
        estimated_tables = 1;
    }

    QueryComplexity {
        requires_joins,
        requires_aggregation,
        requires_sorting,
        requires_filtering,
        estimated_tables,
        score,
    }
}
