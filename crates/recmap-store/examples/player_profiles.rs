//! # Player profiles — conditional writes and lazy migration
//!
//! Demonstrates a typical profile-store scenario: player records live in a
//! key/range table, concurrent writers race on the same record, and the
//! record shape evolves between deployments.
//!
//! ```text
//! Deployment v1 saves:  { id, name, trophies }
//! Deployment v2 loads:  { id, name, trophies, title: "Rookie" }  ← migrated on read
//! ```
//!
//! Run: `cargo run -p recmap-store --example player_profiles`

use recmap::{
    required_str, AttrValue, RawItem, Record, RecordError, RecordKey, RecordUpdate,
};
use recmap_migrate::{Migration, MigrationContext, MigrationError};
use recmap_store::{GetRequest, MapperError, MemoryStore, RecordMapper, SaveParams};

const PROFILES_V1: &str = r#"
[table]
name = "profiles"
root = "Profile"
hash_key = "id"
version = 1
optimistic_locking = true

[[type]]
name = "Profile"
fields = [
    { name = "id", type = "string" },
    { name = "name", type = "string" },
    { name = "trophies", storage = "tr", type = "map<number>" },
]
"#;

#[derive(Debug, Clone, Default)]
struct Profile {
    id: String,
    name: String,
    trophies: std::collections::BTreeMap<String, i64>,
    title: Option<String>,
    revision: Option<u64>,
}

impl Record for Profile {
    fn table_name() -> &'static str {
        "profiles"
    }
    fn key(&self) -> RecordKey {
        RecordKey::hash(self.id.as_str())
    }
    fn revision(&self) -> Option<u64> {
        self.revision
    }
    fn set_revision(&mut self, revision: u64) {
        self.revision = Some(revision);
    }
    fn to_item(&self) -> RawItem {
        let mut item = RawItem::new();
        item.insert("id".into(), AttrValue::from(self.id.as_str()));
        item.insert("name".into(), AttrValue::from(self.name.as_str()));
        item.insert(
            "tr".into(),
            AttrValue::Map(
                self.trophies
                    .iter()
                    .map(|(k, v)| (k.clone(), AttrValue::from(*v)))
                    .collect(),
            ),
        );
        if let Some(title) = &self.title {
            item.insert("title".into(), AttrValue::from(title.as_str()));
        }
        item
    }
    fn from_item(item: &RawItem) -> Result<Self, RecordError> {
        let trophies = item
            .get("tr")
            .and_then(AttrValue::as_map)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_i64().map(|n| (k.clone(), n)))
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            id: required_str(item, "id")?.to_string(),
            name: required_str(item, "name")?.to_string(),
            trophies,
            title: item.get("title").and_then(AttrValue::as_str).map(String::from),
            revision: None,
        })
    }
}

struct AddTitle;

impl Migration for AddTitle {
    fn target_version(&self) -> u32 {
        2
    }
    fn migrate(
        &self,
        item: &mut RawItem,
        _from: u32,
        _ctx: &MigrationContext<'_>,
    ) -> Result<(), MigrationError> {
        let trophies: i64 = item
            .get("tr")
            .and_then(AttrValue::as_map)
            .map(|m| m.values().filter_map(AttrValue::as_i64).sum())
            .unwrap_or(0);
        let title = if trophies >= 10 { "Veteran" } else { "Rookie" };
        item.insert("title".into(), AttrValue::from(title));
        Ok(())
    }
}

fn main() {
    println!("=== Player Profiles Example ===\n");

    // ── Step 1: deployment v1 saves a profile ───────────────────────
    println!("1. Saving a fresh profile...");

    let registry = recmap_schema::load_registry([PROFILES_V1]).unwrap();
    let mut mapper = RecordMapper::new(MemoryStore::new(), registry);

    let profile = Profile {
        id: "p-7".into(),
        name: "ada".into(),
        trophies: [("ranked".to_string(), 3i64)].into(),
        ..Profile::default()
    };
    mapper.save(&profile, &SaveParams::new()).unwrap();

    let loaded: Profile = mapper
        .get(&GetRequest::new(RecordKey::hash("p-7")))
        .unwrap()
        .unwrap();
    println!("   Loaded at revision {:?}", loaded.revision);

    // ── Step 2: two writers race on the same record ─────────────────
    println!("\n2. Two writers race from the same snapshot...");

    let schema = mapper.schema_for("profiles").unwrap();
    let mut first = RecordUpdate::for_record(schema.clone(), &loaded);
    first.increment_map_entry("trophies", "ranked", 1i64);
    let mut second = RecordUpdate::for_record(schema.clone(), &loaded);
    second.set_field("name", "grace");

    let winner: Profile = mapper.update(first).unwrap();
    println!("   First writer wins: ranked={}", winner.trophies["ranked"]);

    match mapper.update::<Profile>(second) {
        Err(MapperError::ConcurrencyConflict) => {
            println!("   Second writer conflicts and must reload")
        }
        other => panic!("expected a conflict, got {other:?}"),
    }

    // ── Step 3: deployment v2 migrates on read ──────────────────────
    println!("\n3. Rolling the schema to v2 (adds a title)...");

    let bumped = PROFILES_V1.replace("version = 1", "version = 2");
    let registry = recmap_schema::load_registry([bumped.as_str()]).unwrap();
    let mapper = RecordMapper::builder(mapper.into_store(), registry)
        .register_migration("Profile", Box::new(AddTitle))
        .build();

    let migrated: Profile = mapper
        .get(&GetRequest::new(RecordKey::hash("p-7")))
        .unwrap()
        .unwrap();
    println!("   Read back with title {:?}", migrated.title);
    assert_eq!(migrated.title.as_deref(), Some("Rookie"));

    println!("\n=== Done! ===");
}
