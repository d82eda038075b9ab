//! Planner export ingester
//!
//! Expected shape:
//! ```json
//! {
//!   "build_slug": "avalanche_shaman",
//!   "mastery": "shaman",
//!   "damage_types": ["cold"],
//!   "archetype": "melee",
//!   "covered_masteries": ["shaman"],
//!   "phases": {
//!     "starter": {"affixes": [{"affix_id": 42, "tier": 5}]},
//!     "endgame": {"affixes": []},
//!     "aspirational": {"affixes": []}
//!   },
//!   "context": {"attack_type": "melee"},
//!   "metadata": {"author": "..."}
//! }
//! ```

use super::{context_value, file_name, file_stem, read_bytes, scalar_text, SourceIngester};
use crate::error::IngestError;
use crate::types::{BuildContext, Phase, RawSource, SourcePayload, TierEntry};
use affixkb_common::hash::sha256_hex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// Reads planner export JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct PlannerIngester;

impl SourceIngester for PlannerIngester {
    fn ingest(&self, path: &Path) -> Result<RawSource, IngestError> {
        let bytes = read_bytes(path)?;
        let data: Value = serde_json::from_slice(&bytes)
            .map_err(|e| IngestError::parse(path, format!("invalid JSON: {}", e)))?;
        if !data.is_object() {
            return Err(IngestError::parse(path, "top level is not an object"));
        }

        let build_slug = required_text(&data, "build_slug").ok_or_else(|| IngestError::missing(path, "build_slug"))?;
        let mastery = required_text(&data, "mastery").ok_or_else(|| IngestError::missing(path, "mastery"))?;
        let phases_raw = match data.get("phases") {
            Some(Value::Object(map)) => map,
            Some(_) => return Err(IngestError::parse(path, "'phases' is not an object")),
            None => return Err(IngestError::missing(path, "phases")),
        };

        let mut phases = BTreeMap::new();
        let mut out_of_range_ids = BTreeSet::new();
        for phase in Phase::ALL {
            let entries = phases_raw
                .get(phase.as_str())
                .and_then(|p| p.get("affixes"))
                .and_then(Value::as_array)
                .map(|affixes| normalize_entries(affixes, path, phase, &mut out_of_range_ids))
                .unwrap_or_default();
            phases.insert(phase, entries);
        }

        let damage_types = damage_types(&data);
        let archetype = required_text(&data, "archetype").unwrap_or_else(|| "unknown".to_string());

        let covered_masteries = match data.get("covered_masteries") {
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            Some(Value::Array(items)) if !items.is_empty() => {
                items.iter().filter_map(scalar_text).collect()
            }
            _ => vec![mastery.clone()],
        };

        let mut metadata = match data.get("metadata") {
            Some(Value::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        };
        metadata.insert("source_file".to_string(), Value::String(file_name(path)));

        let context: BuildContext = match data.get("context") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| context_value(v).map(|cv| (k.clone(), cv)))
                .collect(),
            _ => BuildContext::new(),
        };

        Ok(RawSource {
            source_id: format!("planner:{}", file_stem(path)),
            build_slug,
            mastery,
            damage_types,
            archetype,
            payload: SourcePayload::Planner {
                phases,
                out_of_range_ids,
            },
            checksum: sha256_hex(&bytes),
            covered_masteries,
            metadata,
            context,
        })
    }
}

fn required_text(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(scalar_text)
        .filter(|s| !s.is_empty())
}

/// `damage_types` list, else a single `damage_type`
fn damage_types(data: &Value) -> Vec<String> {
    match data.get("damage_types") {
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .filter_map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect(),
        _ => required_text(data, "damage_type").into_iter().collect(),
    }
}

/// Valid entries, plus any integer affix IDs outside the `u32` range.
/// Tiers are clamped into `u8`; the extractor maps unlisted tiers to its
/// default band.
fn normalize_entries(
    affixes: &[Value],
    path: &Path,
    phase: Phase,
    out_of_range: &mut BTreeSet<i64>,
) -> Vec<TierEntry> {
    let mut entries = Vec::with_capacity(affixes.len());
    for entry in affixes {
        let affix_id = entry.get("affix_id").and_then(as_integer);
        let tier = entry.get("tier").and_then(as_integer);
        let (Some(id), Some(tier)) = (affix_id, tier) else {
            debug!(file = %file_name(path), phase = %phase, entry = %entry, "Skipping malformed affix entry");
            continue;
        };
        let Ok(affix_id) = u32::try_from(id) else {
            debug!(file = %file_name(path), phase = %phase, affix_id = id, "Affix ID out of range");
            out_of_range.insert(id);
            continue;
        };
        let clamped = tier.clamp(0, i64::from(u8::MAX));
        if clamped != tier {
            debug!(file = %file_name(path), phase = %phase, affix_id, tier, "Tier out of range, clamped");
        }
        entries.push(TierEntry {
            affix_id,
            tier: clamped as u8,
        });
    }
    entries
}

/// Integer or numeric string
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContextValue, SourceKind};
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_ingest_full_planner() {
        let dir = TempDir::new().unwrap();
        let body = r#"{
            "build_slug": "avalanche_shaman",
            "mastery": "shaman",
            "damage_type": "cold",
            "phases": {
                "starter": {"affixes": [{"affix_id": 1, "tier": 5}, {"affix_id": "2", "tier": "3"}, {"tier": 4}]},
                "endgame": {"affixes": [{"affix_id": 1, "tier": 7}]}
            },
            "context": {"attack_type": "melee", "uses_shield": true},
            "metadata": {"author": "someone"}
        }"#;
        let path = write(&dir, "avalanche_shaman.json", body);

        let source = PlannerIngester.ingest(&path).unwrap();

        assert_eq!(source.source_id, "planner:avalanche_shaman");
        assert_eq!(source.kind(), SourceKind::Planner);
        assert_eq!(source.damage_types, vec!["cold".to_string()]);
        assert_eq!(source.archetype, "unknown");
        assert_eq!(source.covered_masteries, vec!["shaman".to_string()]);
        assert_eq!(source.checksum, sha256_hex(body.as_bytes()));
        assert_eq!(source.metadata["source_file"], "avalanche_shaman.json");
        assert_eq!(source.metadata["author"], "someone");
        assert_eq!(
            source.context.get("uses_shield"),
            Some(&ContextValue::Scalar("true".into()))
        );

        let SourcePayload::Planner { phases, .. } = &source.payload else {
            panic!("expected planner payload");
        };
        assert_eq!(phases.len(), 3);
        assert_eq!(
            phases[&Phase::Starter],
            vec![
                TierEntry { affix_id: 1, tier: 5 },
                TierEntry { affix_id: 2, tier: 3 }
            ]
        );
        assert!(phases[&Phase::Aspirational].is_empty());
    }

    #[test]
    fn test_damage_types_list_and_covered_masteries_string() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "x.json",
            r#"{"build_slug": "x", "mastery": "druid", "damage_types": ["cold", "physical"],
                "covered_masteries": "druid", "archetype": "shapeshifter", "phases": {}}"#,
        );

        let source = PlannerIngester.ingest(&path).unwrap();

        assert_eq!(source.damage_types, vec!["cold", "physical"]);
        assert_eq!(source.covered_masteries, vec!["druid"]);
        assert_eq!(source.archetype, "shapeshifter");
    }

    #[test]
    fn test_missing_required_fields() {
        let dir = TempDir::new().unwrap();
        let no_slug = write(&dir, "a.json", r#"{"mastery": "shaman", "phases": {}}"#);
        let no_mastery = write(&dir, "b.json", r#"{"build_slug": "b", "mastery": "", "phases": {}}"#);
        let no_phases = write(&dir, "c.json", r#"{"build_slug": "c", "mastery": "shaman"}"#);
        let bad_json = write(&dir, "d.json", "{not json");

        assert!(matches!(
            PlannerIngester.ingest(&no_slug),
            Err(IngestError::MissingField { ref field, .. }) if field == "build_slug"
        ));
        assert!(matches!(
            PlannerIngester.ingest(&no_mastery),
            Err(IngestError::MissingField { ref field, .. }) if field == "mastery"
        ));
        assert!(matches!(
            PlannerIngester.ingest(&no_phases),
            Err(IngestError::MissingField { .. })
        ));
        assert!(matches!(
            PlannerIngester.ingest(&bad_json),
            Err(IngestError::Parse { .. })
        ));
    }

    #[test]
    fn test_out_of_range_ids_kept_and_tiers_clamped() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "neg.json",
            r#"{"build_slug": "neg", "mastery": "shaman", "phases": {
                "starter": {"affixes": [{"affix_id": -4, "tier": 3}, {"affix_id": 5, "tier": 300}]},
                "endgame": {"affixes": [{"affix_id": 6, "tier": -1}, {"affix_id": "8589934592", "tier": 2}]}
            }}"#,
        );

        let source = PlannerIngester.ingest(&path).unwrap();

        assert_eq!(
            source.payload.out_of_range_ids(),
            BTreeSet::from([-4, 8_589_934_592])
        );
        let SourcePayload::Planner { phases, .. } = &source.payload else {
            panic!("expected planner payload");
        };
        assert_eq!(phases[&Phase::Starter], vec![TierEntry { affix_id: 5, tier: 255 }]);
        assert_eq!(phases[&Phase::Endgame], vec![TierEntry { affix_id: 6, tier: 0 }]);
    }
}
