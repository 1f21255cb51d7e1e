//! Data models for sheetsync
//!
//! Defines the shared game entities: sheet templates, sheet instances,
//! encounter presets, roll log entries, and the local item catalog.
//! Field names serialize as camelCase to match the wire format.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sparse stat map (stat key -> value)
pub type StatMap = BTreeMap<StatKey, f64>;

/// Console role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Player,
    Gm,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::Gm => "gm",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "player" => Ok(Role::Player),
            "gm" => Ok(Role::Gm),
            other => Err(format!("Unknown role '{}'. Expected player or gm", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a sheet describes a player character or an enemy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SheetKind {
    #[default]
    Player,
    Enemy,
}

impl SheetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetKind::Player => "player",
            SheetKind::Enemy => "enemy",
        }
    }
}

impl std::fmt::Display for SheetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for SheetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "player" => Ok(SheetKind::Player),
            "enemy" => Ok(SheetKind::Enemy),
            other => Err(format!("Unknown sheet kind '{}'. Expected player or enemy", other)),
        }
    }
}

/// Stat keys: six core stats followed by their grouped sub-stats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatKey {
    Strength,
    Dexterity,
    Constitution,
    Perception,
    Arcane,
    Will,
    Lifting,
    CarryWeight,
    Acrobatics,
    Stamina,
    ReactionTime,
    Health,
    Endurance,
    PainTolerance,
    SightDistance,
    Intuition,
    Registration,
    Mana,
    Control,
    Sensitivity,
    Charisma,
    MentalFortitude,
    Courage,
}

impl StatKey {
    pub const ALL: [StatKey; 23] = [
        StatKey::Strength,
        StatKey::Dexterity,
        StatKey::Constitution,
        StatKey::Perception,
        StatKey::Arcane,
        StatKey::Will,
        StatKey::Lifting,
        StatKey::CarryWeight,
        StatKey::Acrobatics,
        StatKey::Stamina,
        StatKey::ReactionTime,
        StatKey::Health,
        StatKey::Endurance,
        StatKey::PainTolerance,
        StatKey::SightDistance,
        StatKey::Intuition,
        StatKey::Registration,
        StatKey::Mana,
        StatKey::Control,
        StatKey::Sensitivity,
        StatKey::Charisma,
        StatKey::MentalFortitude,
        StatKey::Courage,
    ];

    /// Wire name (snake_case)
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKey::Strength => "strength",
            StatKey::Dexterity => "dexterity",
            StatKey::Constitution => "constitution",
            StatKey::Perception => "perception",
            StatKey::Arcane => "arcane",
            StatKey::Will => "will",
            StatKey::Lifting => "lifting",
            StatKey::CarryWeight => "carry_weight",
            StatKey::Acrobatics => "acrobatics",
            StatKey::Stamina => "stamina",
            StatKey::ReactionTime => "reaction_time",
            StatKey::Health => "health",
            StatKey::Endurance => "endurance",
            StatKey::PainTolerance => "pain_tolerance",
            StatKey::SightDistance => "sight_distance",
            StatKey::Intuition => "intuition",
            StatKey::Registration => "registration",
            StatKey::Mana => "mana",
            StatKey::Control => "control",
            StatKey::Sensitivity => "sensitivity",
            StatKey::Charisma => "charisma",
            StatKey::MentalFortitude => "mental_fortitude",
            StatKey::Courage => "courage",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            StatKey::Strength => "Strength",
            StatKey::Dexterity => "Dexterity",
            StatKey::Constitution => "Constitution",
            StatKey::Perception => "Perception",
            StatKey::Arcane => "Arcane",
            StatKey::Will => "Will",
            StatKey::Lifting => "Lifting",
            StatKey::CarryWeight => "Carry Weight",
            StatKey::Acrobatics => "Acrobatics",
            StatKey::Stamina => "Stamina",
            StatKey::ReactionTime => "Reaction Time",
            StatKey::Health => "Health",
            StatKey::Endurance => "Endurance",
            StatKey::PainTolerance => "Pain Tolerance",
            StatKey::SightDistance => "Sight Distance",
            StatKey::Intuition => "Intuition",
            StatKey::Registration => "Registration",
            StatKey::Mana => "Mana",
            StatKey::Control => "Control",
            StatKey::Sensitivity => "Sensitivity",
            StatKey::Charisma => "Charisma",
            StatKey::MentalFortitude => "Mental Fortitude",
            StatKey::Courage => "Courage",
        }
    }
}

impl std::str::FromStr for StatKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        StatKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == needle)
            .ok_or_else(|| format!("Unknown stat '{}'", s))
    }
}

impl std::fmt::Display for StatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Anything stored in an ordered entity collection
pub trait Entity {
    fn id(&self) -> &str;
}

/// Authoring-time sheet definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SheetTemplate {
    pub id: String,
    pub kind: SheetKind,
    pub name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub stats: StatMap,
    #[serde(default)]
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl SheetTemplate {
    /// Create a template with empty notes, stats and tags
    pub fn new(id: impl Into<String>, kind: SheetKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            notes: String::new(),
            stats: StatMap::new(),
            tags: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Set a single stat value
    pub fn with_stat(mut self, key: StatKey, value: f64) -> Self {
        self.stats.insert(key, value);
        self
    }

    /// Add a tag (duplicates are ignored)
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Merge a partial change set into this template
    pub fn apply_changes(&mut self, changes: &TemplateChanges) {
        if let Some(kind) = changes.kind {
            self.kind = kind;
        }
        if let Some(ref name) = changes.name {
            self.name = name.clone();
        }
        if let Some(ref notes) = changes.notes {
            self.notes = notes.clone();
        }
        if let Some(ref stats) = changes.stats {
            self.stats = stats.clone();
        }
        if let Some(ref tags) = changes.tags {
            self.tags = tags.clone();
        }
        self.updated_at = Utc::now();
    }
}

impl Entity for SheetTemplate {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Partial template used by `update_template`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SheetKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl TemplateChanges {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.name.is_none()
            && self.notes.is_none()
            && self.stats.is_none()
            && self.tags.is_none()
    }
}

/// Play-time copy of a template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SheetInstance {
    pub id: String,
    pub template_id: String,
    pub kind: SheetKind,
    pub name: String,
    #[serde(default)]
    pub notes: String,
    pub updated_at: DateTime<Utc>,
}

impl SheetInstance {
    /// Spawn an instance from a template, copying kind, name and notes
    pub fn spawn(id: impl Into<String>, template: &SheetTemplate, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            template_id: template.id.clone(),
            kind: template.kind,
            name: name.into(),
            notes: template.notes.clone(),
            updated_at: Utc::now(),
        }
    }
}

impl Entity for SheetInstance {
    fn id(&self) -> &str {
        &self.id
    }
}

/// One roster line of an encounter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncounterEntry {
    pub template_id: String,
    pub count: u32,
}

/// Named roster used to bulk-spawn instances
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncounterPreset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub entries: Vec<EncounterEntry>,
    pub updated_at: DateTime<Utc>,
}

impl EncounterPreset {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entries: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Append a roster line
    pub fn with_entry(mut self, template_id: impl Into<String>, count: u32) -> Self {
        self.entries.push(EncounterEntry {
            template_id: template_id.into(),
            count,
        });
        self
    }
}

impl Entity for EncounterPreset {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Item catalog entry (local only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplate {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub rank: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub immediate_effects: String,
    #[serde(default)]
    pub non_immediate_effects: String,
    pub updated_at: DateTime<Utc>,
}

impl ItemTemplate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        item_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            item_type: item_type.into(),
            rank: String::new(),
            weight: String::new(),
            value: String::new(),
            immediate_effects: String::new(),
            non_immediate_effects: String::new(),
            updated_at: Utc::now(),
        }
    }
}

impl Entity for ItemTemplate {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A sheet's reference to a catalog item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SheetInventoryItem {
    pub id: String,
    pub item_template_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RollVisibility {
    #[default]
    Visible,
    Hidden,
}

/// What the user asked to roll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RollRequest {
    pub sheet_id: String,
    pub stat: StatKey,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub visibility: RollVisibility,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RollStatus {
    Pending,
    Resolved,
    Failed,
}

/// One dice-roll transaction in the roll log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RollLogEntry {
    pub id: String,
    pub status: RollStatus,
    pub request: RollRequest,
    pub created_at: DateTime<Utc>,
    pub requested_by_role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Intent that produced this entry, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,
}

impl RollLogEntry {
    /// A locally created entry awaiting the backend's result
    pub fn pending(id: impl Into<String>, request: RollRequest, role: Role) -> Self {
        Self {
            id: id.into(),
            status: RollStatus::Pending,
            request,
            created_at: Utc::now(),
            requested_by_role: role,
            result_text: None,
            error: None,
            intent_id: None,
        }
    }

    /// Merge a partial update (the id is never changed)
    pub fn merge(&mut self, update: &RollLogUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(ref result_text) = update.result_text {
            self.result_text = Some(result_text.clone());
        }
        if let Some(ref error) = update.error {
            self.error = Some(error.clone());
        }
        if let Some(ref request) = update.request {
            self.request = request.clone();
        }
        if let Some(created_at) = update.created_at {
            self.created_at = created_at;
        }
        if let Some(role) = update.requested_by_role {
            self.requested_by_role = role;
        }
        if let Some(ref intent_id) = update.intent_id {
            self.intent_id = Some(intent_id.clone());
        }
    }
}

/// Partial roll log entry used by `update_roll_log`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RollLogUpdate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RollStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RollRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by_role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,
}

/// A handful of catalog items to start from
pub fn default_item_library() -> Vec<ItemTemplate> {
    let seeded = |id: &str, name: &str, item_type: &str, rank: &str, effects: &str| ItemTemplate {
        rank: rank.to_string(),
        immediate_effects: effects.to_string(),
        ..ItemTemplate::new(id, name, item_type)
    };

    vec![
        seeded(
            "item_light_steps",
            "Light steps",
            "Light Armour",
            "C+",
            "10% damage resistance; advantage on stealth checks.",
        ),
        seeded("item_never_dulls", "Never dulls", "Sword", "D", "Does 15 damage."),
        seeded(
            "item_helm_of_sight",
            "Helm of sight",
            "Helmet",
            "C",
            "+2 to perception.",
        ),
    ]
}
