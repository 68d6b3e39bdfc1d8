//! Static column registry.
//!
//! Family membership is declared here once. Stages look columns up by the
//! constants in [`names`] and by family, never by matching header prefixes.

use super::column_def::{ColumnDef, ColumnFamily as F, ColumnRegistry, ColumnRole as R};

/// Column header constants.
pub mod names {
    // Keys
    pub const COUNTY_FIP: &str = "county_fip";
    pub const STATE_CODE: &str = "state_code";
    pub const DATE: &str = "date";
    pub const STATE: &str = "state";
    pub const COUNTY: &str = "county";

    // Cumulative counts
    pub const CONFIRMED: &str = "confirmed";
    pub const DEATHS: &str = "deaths";

    // Raw policy flags
    pub const TRAVEL_LIMIT: &str = "travel_limit";
    pub const STAY_HOME: &str = "stay_home";
    pub const EDUCATIONAL_FAC: &str = "educational_fac";
    pub const PHASE_1: &str = "phase_1";
    pub const PHASE_2: &str = "phase_2";
    pub const PHASE_3: &str = "phase_3";

    // Resolved policy
    pub const POLICY: &str = "policy";
    pub const POLICY_CODE: &str = "policy_code";

    // Mobility
    pub const RETAIL_AND_RECREATION: &str = "retail_and_recreation";
    pub const GROCERY_AND_PHARMACY: &str = "grocery_and_pharmacy";
    pub const PARKS: &str = "parks";
    pub const TRANSIT_STATIONS: &str = "transit_stations";
    pub const WORKPLACES: &str = "workplaces";
    pub const RESIDENTIAL: &str = "residential";

    // Weather
    pub const TMPF_MEAN: &str = "tmpf_mean";
    pub const RELH_MEAN: &str = "relh_mean";

    // Economic
    pub const LABOR_FORCE: &str = "labor_force";
    pub const UNEMPLOYED: &str = "unemployed";

    // Demographic
    pub const POP_TOTAL: &str = "acs_pop_total";
    pub const MEDIAN_HH_INCOME: &str = "acs_median_hh_income";
    pub const GENDER_FEMALE: &str = "acs_gender_female";
    pub const RACE_MINORITY: &str = "acs_race_minority";
    pub const AGE_LE_24: &str = "acs_age_le_24";
    pub const AGE_25_34: &str = "acs_age_25_34";
    pub const AGE_35_44: &str = "acs_age_35_44";
    pub const AGE_45_54: &str = "acs_age_45_54";
    pub const AGE_55_64: &str = "acs_age_55_64";
    pub const AGE_65_74: &str = "acs_age_65_74";
    pub const AGE_75_84: &str = "acs_age_75_84";
    pub const AGE_85_GE: &str = "acs_age_85_ge";

    // Density
    pub const POP_DENSITY: &str = "pop_density";

    // Testing
    pub const COV_POS_TESTS: &str = "cov_pos_tests";
    pub const COV_TOTAL_TESTS: &str = "cov_total_tests";

    // Derived: policy timing
    pub const DAYS_IN_POLICY: &str = "days_in_policy_phase";

    // Derived: demographic/economic
    pub const AGE_0_24_FRAC: &str = "age_0_24_frac";
    pub const AGE_25_44_FRAC: &str = "age_25_44_frac";
    pub const AGE_45_64_FRAC: &str = "age_45_64_frac";
    pub const AGE_65_PLUS_FRAC: &str = "age_65_plus_frac";
    pub const INCOME_SCALED: &str = "income_10k";
    pub const UNEMPLOYMENT_RATE: &str = "unemployment_rate";
    pub const UNEMPLOYMENT_PENETRATION: &str = "unemployment_penetration";
    pub const UNEMPLOYMENT_TARGET: &str = "unemployment_target";
    pub const UNEMPLOYMENT_PCT_DELTA: &str = "unemployment_pct_delta";
    pub const TESTING_POS_PROP: &str = "cov_testing_pos_prop";
    pub const TMPF_SCALED: &str = "tmpf_scaled";
    pub const RELH_SCALED: &str = "relh_scaled";
    pub const POP_DENSITY_SCALED: &str = "pop_density_scaled";
}

use names::*;

/// Raw policy flag columns and their binary output columns.
pub const POLICY_FLAGS: &[(&str, &str)] = &[
    (TRAVEL_LIMIT, "policy_travel_limit"),
    (STAY_HOME, "policy_stay_home"),
    (EDUCATIONAL_FAC, "policy_educational_fac"),
    (PHASE_1, "policy_phase_1"),
    (PHASE_2, "policy_phase_2"),
    (PHASE_3, "policy_phase_3"),
];

pub const MOBILITY_COLUMNS: &[&str] = &[
    RETAIL_AND_RECREATION,
    GROCERY_AND_PHARMACY,
    PARKS,
    TRANSIT_STATIONS,
    WORKPLACES,
    RESIDENTIAL,
];

pub const WEATHER_COLUMNS: &[&str] = &[TMPF_MEAN, RELH_MEAN];

pub const ECONOMIC_COLUMNS: &[&str] = &[LABOR_FORCE, UNEMPLOYED];

/// Demographic columns filled by the state population-weighted median.
pub const DEMOGRAPHIC_IMPUTED_COLUMNS: &[&str] = &[MEDIAN_HH_INCOME, GENDER_FEMALE, RACE_MINORITY];

pub const DENSITY_COLUMNS: &[&str] = &[POP_DENSITY];

/// Optional test counts; positivity is derived only when both are present.
pub const TESTING_COLUMNS: &[&str] = &[COV_POS_TESTS, COV_TOTAL_TESTS];

/// Fine-grained census age columns.
pub const AGE_COLUMNS: &[&str] = &[
    AGE_LE_24, AGE_25_34, AGE_35_44, AGE_45_54, AGE_55_64, AGE_65_74, AGE_75_84, AGE_85_GE,
];

/// Coarse age bands: output column and the census columns summed into it.
pub const AGE_BANDS: &[(&str, &[&str])] = &[
    (AGE_0_24_FRAC, &[AGE_LE_24]),
    (AGE_25_44_FRAC, &[AGE_25_34, AGE_35_44]),
    (AGE_45_64_FRAC, &[AGE_45_54, AGE_55_64]),
    (AGE_65_PLUS_FRAC, &[AGE_65_74, AGE_75_84, AGE_85_GE]),
];

/// A cumulative count and the prefix of every feature derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSeries {
    pub source: &'static str,
    pub prefix: &'static str,
}

impl CountSeries {
    pub fn new_counts(&self) -> String {
        format!("{}_new", self.prefix)
    }
    pub fn sum_7day(&self) -> String {
        format!("{}_7day_sum", self.prefix)
    }
    pub fn sum_7day_lag(&self) -> String {
        format!("{}_7day_sum_lag", self.prefix)
    }
    pub fn sum_7day_lead(&self) -> String {
        format!("{}_7day_sum_lead", self.prefix)
    }
    pub fn pct_delta(&self) -> String {
        format!("{}_7day_pct_delta", self.prefix)
    }
    pub fn target(&self) -> String {
        format!("{}_target", self.prefix)
    }
    pub fn target_lead(&self) -> String {
        format!("{}_target_lead", self.prefix)
    }
    pub fn penetration(&self) -> String {
        format!("{}_penetration", self.prefix)
    }
    pub fn momentum(&self) -> String {
        format!("{}_momentum", self.prefix)
    }
    pub fn days_since_first(&self) -> String {
        format!("days_since_first_{}", self.prefix)
    }

    /// Derived columns that must be complete after the trim.
    pub fn feature_columns(&self) -> Vec<String> {
        vec![
            self.new_counts(),
            self.sum_7day(),
            self.target(),
            self.penetration(),
            self.days_since_first(),
        ]
    }

    /// Derived columns that stay null where their window leaves the series.
    pub fn edge_columns(&self) -> Vec<String> {
        vec![
            self.sum_7day_lag(),
            self.sum_7day_lead(),
            self.pct_delta(),
            self.target_lead(),
            self.momentum(),
        ]
    }
}

pub const COUNT_SERIES: &[CountSeries] = &[
    CountSeries {
        source: CONFIRMED,
        prefix: "infection",
    },
    CountSeries {
        source: DEATHS,
        prefix: "death",
    },
];

/// Declared input columns.
pub const INPUT_COLUMNS: &[ColumnDef] = &[
    ColumnDef::numeric(COUNTY_FIP, F::Key, R::Complete, "County FIPS code"),
    ColumnDef::text(STATE_CODE, F::Key, R::Complete, "Two-letter state code"),
    ColumnDef::text(DATE, F::Key, R::Complete, "Observation date"),
    ColumnDef::text(STATE, F::Key, R::Complete, "State name").optional(),
    ColumnDef::text(COUNTY, F::Key, R::Complete, "County name").optional(),
    ColumnDef::numeric(CONFIRMED, F::Cumulative, R::Complete, "Cumulative confirmed cases"),
    ColumnDef::numeric(DEATHS, F::Cumulative, R::Complete, "Cumulative deaths"),
    ColumnDef::text(TRAVEL_LIMIT, F::Policy, R::RawInput, "Travel limit flag").optional(),
    ColumnDef::text(STAY_HOME, F::Policy, R::RawInput, "Stay-home order flag"),
    ColumnDef::text(EDUCATIONAL_FAC, F::Policy, R::RawInput, "School closure flag").optional(),
    ColumnDef::text(PHASE_1, F::Policy, R::RawInput, "Phase 1 reopening flag"),
    ColumnDef::text(PHASE_2, F::Policy, R::RawInput, "Phase 2 reopening flag"),
    ColumnDef::text(PHASE_3, F::Policy, R::RawInput, "Phase 3 reopening flag"),
    ColumnDef::numeric(RETAIL_AND_RECREATION, F::Mobility, R::Imputed, "Retail and recreation mobility"),
    ColumnDef::numeric(GROCERY_AND_PHARMACY, F::Mobility, R::Imputed, "Grocery and pharmacy mobility"),
    ColumnDef::numeric(PARKS, F::Mobility, R::Imputed, "Parks mobility"),
    ColumnDef::numeric(TRANSIT_STATIONS, F::Mobility, R::Imputed, "Transit stations mobility"),
    ColumnDef::numeric(WORKPLACES, F::Mobility, R::Imputed, "Workplaces mobility"),
    ColumnDef::numeric(RESIDENTIAL, F::Mobility, R::Imputed, "Residential mobility"),
    ColumnDef::numeric(TMPF_MEAN, F::Weather, R::Imputed, "Mean temperature (F)"),
    ColumnDef::numeric(RELH_MEAN, F::Weather, R::Imputed, "Mean relative humidity"),
    ColumnDef::numeric(LABOR_FORCE, F::Economic, R::Imputed, "Labor force count"),
    ColumnDef::numeric(UNEMPLOYED, F::Economic, R::Imputed, "Unemployed count"),
    ColumnDef::numeric(POP_TOTAL, F::Demographic, R::Complete, "Total population"),
    ColumnDef::numeric(MEDIAN_HH_INCOME, F::Demographic, R::Imputed, "Median household income"),
    ColumnDef::numeric(GENDER_FEMALE, F::Demographic, R::Imputed, "Female fraction").optional(),
    ColumnDef::numeric(RACE_MINORITY, F::Demographic, R::Imputed, "Minority fraction").optional(),
    ColumnDef::numeric(AGE_LE_24, F::Demographic, R::Complete, "Population aged 24 or less"),
    ColumnDef::numeric(AGE_25_34, F::Demographic, R::Complete, "Population aged 25-34"),
    ColumnDef::numeric(AGE_35_44, F::Demographic, R::Complete, "Population aged 35-44"),
    ColumnDef::numeric(AGE_45_54, F::Demographic, R::Complete, "Population aged 45-54"),
    ColumnDef::numeric(AGE_55_64, F::Demographic, R::Complete, "Population aged 55-64"),
    ColumnDef::numeric(AGE_65_74, F::Demographic, R::Complete, "Population aged 65-74"),
    ColumnDef::numeric(AGE_75_84, F::Demographic, R::Complete, "Population aged 75-84"),
    ColumnDef::numeric(AGE_85_GE, F::Demographic, R::Complete, "Population aged 85 or more"),
    ColumnDef::numeric(POP_DENSITY, F::Density, R::Imputed, "Population per square mile"),
    ColumnDef::numeric(COV_POS_TESTS, F::Testing, R::Imputed, "Cumulative positive tests").optional(),
    ColumnDef::numeric(COV_TOTAL_TESTS, F::Testing, R::Imputed, "Cumulative tests performed").optional(),
];

/// Registry of every input column.
pub fn input_registry() -> ColumnRegistry {
    ColumnRegistry::new(INPUT_COLUMNS.iter().copied())
}

/// Registry of input plus derived columns, used by the final checks.
pub fn full_registry() -> ColumnRegistry {
    let mut defs: Vec<ColumnDef> = INPUT_COLUMNS.to_vec();
    defs.push(ColumnDef::text(POLICY, F::Policy, R::Feature, "Resolved policy phase"));
    defs.push(ColumnDef::numeric(POLICY_CODE, F::Policy, R::Feature, "Ordinal policy code"));
    for &(_, out) in POLICY_FLAGS {
        defs.push(ColumnDef::numeric(out, F::Policy, R::Feature, "Binary policy indicator"));
    }
    for (out, _) in AGE_BANDS {
        defs.push(ColumnDef::numeric(out, F::Derived, R::Feature, "Age band fraction"));
    }
    for (name, desc) in [
        (DAYS_IN_POLICY, "Days since the current policy run began"),
        (INCOME_SCALED, "Median household income / 10k"),
        (UNEMPLOYMENT_RATE, "Unemployed / labor force"),
        (UNEMPLOYMENT_PENETRATION, "Unemployed / population"),
        (UNEMPLOYMENT_TARGET, "Change in unemployed over the window"),
        (TESTING_POS_PROP, "Positive tests / total tests"),
        (TMPF_SCALED, "Per-county min-max temperature"),
        (RELH_SCALED, "Per-county min-max humidity"),
        (POP_DENSITY_SCALED, "Min-max of log density"),
    ] {
        defs.push(ColumnDef::numeric(name, F::Derived, R::Feature, desc));
    }
    defs.push(ColumnDef::numeric(
        UNEMPLOYMENT_PCT_DELTA,
        F::Derived,
        R::EdgeReference,
        "Relative change in unemployed over the window",
    ));
    ColumnRegistry::new(defs)
}

/// Derived columns that may legitimately stay null in the final table.
pub fn edge_reference_columns() -> Vec<String> {
    let mut columns: Vec<String> = COUNT_SERIES.iter().flat_map(|s| s.edge_columns()).collect();
    columns.push(UNEMPLOYMENT_PCT_DELTA.to_string());
    columns
}

/// Count-series feature columns that must be complete after the trim.
pub fn count_feature_columns() -> Vec<String> {
    COUNT_SERIES.iter().flat_map(|s| s.feature_columns()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnRole;

    #[test]
    fn test_input_registry_families() {
        let registry = input_registry();
        assert_eq!(registry.by_family(F::Mobility).len(), MOBILITY_COLUMNS.len());
        assert_eq!(registry.by_family(F::Weather).len(), 2);
        assert!(registry.get(STAY_HOME).unwrap().is_required());
        assert!(!registry.get(TRAVEL_LIMIT).unwrap().is_required());
    }

    #[test]
    fn test_full_registry_roles() {
        let registry = full_registry();
        assert_eq!(registry.get(POLICY_CODE).unwrap().role, ColumnRole::Feature);
        assert_eq!(registry.get(PHASE_2).unwrap().role, ColumnRole::RawInput);
        assert!(registry.len() > INPUT_COLUMNS.len());
    }

    #[test]
    fn test_count_series_names() {
        let infection = COUNT_SERIES[0];
        assert_eq!(infection.sum_7day(), "infection_7day_sum");
        assert_eq!(infection.target_lead(), "infection_target_lead");
        assert_eq!(COUNT_SERIES[1].days_since_first(), "days_since_first_death");
        assert_eq!(edge_reference_columns().len(), 11);
        assert_eq!(count_feature_columns().len(), 10);
        assert!(infection.edge_columns().contains(&infection.momentum()));
    }
}
