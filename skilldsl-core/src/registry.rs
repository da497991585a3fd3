//! Built-in catalog of the estimation skills and their default wiring.

use std::sync::LazyLock;

use serde::Serialize;

use crate::ast::{Value, ValueMap};
use crate::generator::Generator;
use crate::skill::SkillDescriptor;
use crate::wiring::{Connection, Wiring};

/// Header line of the rendered registry document.
pub const DOCUMENT_TITLE: &str = "NeoExcelPPT Skills DSL";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryEntry {
    /// Lookup key; the skill id without its colon.
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub descriptor: SkillDescriptor,
}

static REGISTRY: LazyLock<Vec<RegistryEntry>> = LazyLock::new(builtin_skills);

const PROJECT_SCOPE_COMPUTE: &str = "(let [files (get input :file-counts)
      simple (get files :simple)
      medium (get files :medium)
      complex (get files :complex)
      total (+ simple medium complex)]
  (set :simple simple)
  (set :medium medium)
  (set :complex complex)
  (emit :total-files total)
  (emit :component-breakdown
    {:simple simple :medium medium :complex complex}))";

const COMPONENT_CALCULATOR_COMPUTE: &str = "(let [files (get input :file-count)
      hours (get state :base-hours-per-file)
      auto-pct (get input :automation-pct)
      base-effort (* files hours)
      scaled (* base-effort (- 1 (/ auto-pct 100)))]
  (emit :scaled-effort scaled)
  (emit :component-days (/ scaled 8)))";

const ACTIVITY_CALCULATOR_COMPUTE: &str = "(let [update (get input :activity-update)]
  (set :activities (merge (get state :activities) update))
  (emit :activity-totals (sum-values (get state :activities))))";

const EFFORT_AGGREGATOR_COMPUTE: &str = "(let [comp (get input :component-effort)
      act (get input :activity-effort)
      buf (get input :buffer-days)
      total (+ comp act buf)]
  (emit :total-days total)
  (emit :effort-breakdown {:component comp :activity act :buffer buf}))";

const BUFFER_CALCULATOR_COMPUTE: &str = "(let [base (get input :base-days)
      leave (* base (/ (get state :leave-pct) 100))
      dep (* base (/ (get state :dependency-pct) 100))
      learn (* base (/ (get state :learning-pct) 100))]
  (emit :buffer-days (+ leave dep learn))
  (emit :buffer-breakdown {:leave leave :dependency dep :learning learn}))";

fn counters(names: &[&str]) -> ValueMap {
    names.iter().map(|name| (*name, Value::int(0))).collect()
}

fn builtin_skills() -> Vec<RegistryEntry> {
    vec![
        RegistryEntry {
            key: "project-scope",
            name: "Project Scope",
            description: "Manages project file counts (simple/medium/complex) and computes totals and breakdowns.",
            descriptor: SkillDescriptor::new("project-scope")
                .with_inputs(["file-counts"])
                .with_outputs(["total-files", "component-breakdown"])
                .with_state(counters(&["simple", "medium", "complex"]))
                .with_compute_source(PROJECT_SCOPE_COMPUTE),
        },
        RegistryEntry {
            key: "component-calculator",
            name: "Component Calculator",
            description: "Scales file counts by component multipliers and applies automation percentages.",
            descriptor: SkillDescriptor::new("component-calculator")
                .with_inputs(["file-count", "breakdown", "automation-pct"])
                .with_outputs(["scaled-effort", "component-days"])
                .with_state([("base-hours-per-file", Value::int(15))].into_iter().collect())
                .with_compute_source(COMPONENT_CALCULATOR_COMPUTE),
        },
        RegistryEntry {
            key: "activity-calculator",
            name: "Activity Calculator",
            description: "Manages activity/task records with team assignments and computes totals.",
            descriptor: SkillDescriptor::new("activity-calculator")
                .with_inputs(["activity-update", "team-assignment"])
                .with_outputs(["activity-totals", "team-effort"])
                .with_state([("activities", Value::Map(ValueMap::new()))].into_iter().collect())
                .with_compute_source(ACTIVITY_CALCULATOR_COMPUTE),
        },
        RegistryEntry {
            key: "effort-aggregator",
            name: "Effort Aggregator",
            description: "Aggregates component effort, activity effort, and buffer days into total estimate.",
            descriptor: SkillDescriptor::new("effort-aggregator")
                .with_inputs(["component-effort", "activity-effort", "buffer-days"])
                .with_outputs(["total-days", "effort-breakdown"])
                .with_state(counters(&["component", "activity", "buffer"]))
                .with_compute_source(EFFORT_AGGREGATOR_COMPUTE),
        },
        RegistryEntry {
            key: "buffer-calculator",
            name: "Buffer Calculator",
            description: "Computes project buffers (leave, dependency, learning curve) as percentage of base days.",
            descriptor: SkillDescriptor::new("buffer-calculator")
                .with_inputs(["base-days", "buffer-config"])
                .with_outputs(["buffer-days", "buffer-breakdown"])
                .with_state(
                    [
                        ("leave-pct", Value::int(10)),
                        ("dependency-pct", Value::int(15)),
                        ("learning-pct", Value::int(20)),
                    ]
                    .into_iter()
                    .collect(),
                )
                .with_compute_source(BUFFER_CALCULATOR_COMPUTE),
        },
    ]
}

/// Registry entries in catalog order.
pub fn all_skills() -> &'static [RegistryEntry] {
    &REGISTRY
}

/// Looks a skill up by id; a leading `:` is ignored.
pub fn get_skill(id: &str) -> Option<&'static RegistryEntry> {
    let key = id.trim_start_matches(':');
    REGISTRY.iter().find(|entry| entry.key == key)
}

pub fn skill_ids() -> Vec<&'static str> {
    REGISTRY.iter().map(|entry| entry.key).collect()
}

pub fn descriptors() -> Vec<SkillDescriptor> {
    REGISTRY.iter().map(|entry| entry.descriptor.clone()).collect()
}

/// The canonical five-link data flow between the built-in skills.
pub fn default_wiring() -> Wiring {
    let mut wiring = Wiring::new();
    wiring
        .connect("project-scope", "total-files", "component-calculator", "file-count")
        .connect("project-scope", "component-breakdown", "component-calculator", "breakdown")
        .connect("component-calculator", "scaled-effort", "effort-aggregator", "component-effort")
        .connect("activity-calculator", "activity-totals", "effort-aggregator", "activity-effort")
        .connect("effort-aggregator", "total-days", "buffer-calculator", "base-days");
    wiring
}

pub fn default_connections() -> Vec<Connection> {
    default_wiring().connections().to_vec()
}

/// Full DSL file for the registry: every skill followed by the default wiring.
pub fn render_registry_document(generator: &Generator) -> String {
    let title = format!("{DOCUMENT_TITLE}\n;; Built-in skill catalog");
    generator.render_document(&title, &descriptors(), default_wiring().connections())
}
