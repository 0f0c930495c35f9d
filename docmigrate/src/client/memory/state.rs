use crate::common::{Document, ObjectId, Value};
use crate::doc;
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use indexmap::{IndexMap, IndexSet};

const ID_FIELD: &str = "_id";
const ID_INDEX: &str = "_id_";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IndexSpec {
    pub(crate) name: String,
    pub(crate) keys: Document,
    pub(crate) unique: bool,
}

impl IndexSpec {
    fn key_of(&self, document: &Document) -> Vec<Value> {
        self.keys
            .keys()
            .map(|field| document.get(field).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

/// Documents and indexes of one collection.
#[derive(Debug, Clone)]
pub(crate) struct CollectionState {
    documents: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

impl Default for CollectionState {
    fn default() -> Self {
        CollectionState {
            documents: Vec::new(),
            indexes: vec![IndexSpec {
                name: ID_INDEX.to_string(),
                keys: doc! { "_id": 1 },
                unique: true,
            }],
        }
    }
}

impl CollectionState {
    pub(crate) fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub(crate) fn index_names(&self) -> Vec<String> {
        self.indexes.iter().map(|i| i.name.clone()).collect()
    }

    /// Inserts a document, generating `_id` when missing, and enforces every
    /// unique index.
    pub(crate) fn insert(&mut self, namespace: &str, document: Document) -> MigrateResult<Value> {
        let document = with_id(document);
        for index in self.indexes.iter().filter(|i| i.unique) {
            let key = index.key_of(&document);
            if self.documents.iter().any(|existing| index.key_of(existing) == key) {
                return Err(duplicate_key(namespace, &index.name, &key));
            }
        }

        let id = document.get(ID_FIELD).cloned().unwrap_or(Value::Null);
        self.documents.push(document);
        Ok(id)
    }

    pub(crate) fn find_one(&self, filter: &Document) -> Option<Document> {
        self.documents.iter().find(|d| d.matches(filter)).cloned()
    }

    pub(crate) fn delete(&mut self, filter: &Document, limit_one: bool) -> u64 {
        if limit_one {
            match self.documents.iter().position(|d| d.matches(filter)) {
                Some(pos) => {
                    self.documents.remove(pos);
                    1
                }
                None => 0,
            }
        } else {
            let before = self.documents.len();
            self.documents.retain(|d| !d.matches(filter));
            (before - self.documents.len()) as u64
        }
    }

    /// Applies `$set` / `$unset` operators or a full replacement to matching
    /// documents. Returns the number of documents modified.
    pub(crate) fn update(
        &mut self,
        namespace: &str,
        filter: &Document,
        update: &Document,
        multi: bool,
    ) -> MigrateResult<u64> {
        let uses_operators = update.keys().any(|k| k.starts_with('$'));
        let mut updated = self.documents.clone();
        let mut modified = 0;

        for document in updated.iter_mut().filter(|d| d.matches(filter)) {
            let id = document.get(ID_FIELD).cloned();
            let mut next = if uses_operators {
                apply_operators(document, update)?
            } else {
                update.clone()
            };
            if let Some(id) = id {
                next = with_given_id(next, id);
            }
            *document = next;
            modified += 1;
            if !multi {
                break;
            }
        }

        for index in self.indexes.iter().filter(|i| i.unique) {
            let mut seen: Vec<Vec<Value>> = Vec::with_capacity(updated.len());
            for document in &updated {
                let key = index.key_of(document);
                if seen.contains(&key) {
                    return Err(duplicate_key(namespace, &index.name, &key));
                }
                seen.push(key);
            }
        }

        self.documents = updated;
        Ok(modified)
    }

    /// Creates an index. Re-creating an identical index is a no-op.
    pub(crate) fn create_index(&mut self, namespace: &str, spec: IndexSpec) -> MigrateResult<String> {
        if let Some(existing) = self.indexes.iter().find(|i| i.name == spec.name) {
            if existing.keys == spec.keys && existing.unique == spec.unique {
                return Ok(spec.name);
            }
            return Err(MigrateError::new(
                &format!(
                    "index with name {} already exists with different options in {}",
                    spec.name, namespace
                ),
                ErrorKind::InvalidCommand,
            ));
        }

        if spec.unique {
            let mut seen: Vec<Vec<Value>> = Vec::with_capacity(self.documents.len());
            for document in &self.documents {
                let key = spec.key_of(document);
                if seen.contains(&key) {
                    return Err(duplicate_key(namespace, &spec.name, &key));
                }
                seen.push(key);
            }
        }

        let name = spec.name.clone();
        self.indexes.push(spec);
        Ok(name)
    }

    pub(crate) fn drop_index(&mut self, namespace: &str, name: &str) -> MigrateResult<()> {
        if name == "*" {
            self.indexes.retain(|i| i.name == ID_INDEX);
            return Ok(());
        }
        if name == ID_INDEX {
            return Err(MigrateError::new(
                "cannot drop _id index",
                ErrorKind::InvalidCommand,
            ));
        }
        let before = self.indexes.len();
        self.indexes.retain(|i| i.name != name);
        if self.indexes.len() == before {
            return Err(MigrateError::new(
                &format!("index not found with name [{}] in {}", name, namespace),
                ErrorKind::InvalidCommand,
            ));
        }
        Ok(())
    }
}

/// Collections of one database.
#[derive(Debug, Clone, Default)]
pub(crate) struct DatabaseState {
    collections: IndexMap<String, CollectionState>,
}

impl DatabaseState {
    pub(crate) fn collection(&self, name: &str) -> Option<&CollectionState> {
        self.collections.get(name)
    }

    /// Returns the collection, creating it on first use.
    pub(crate) fn collection_mut(&mut self, name: &str) -> &mut CollectionState {
        self.collections.entry(name.to_string()).or_default()
    }

    pub(crate) fn existing_collection_mut(&mut self, name: &str) -> Option<&mut CollectionState> {
        self.collections.get_mut(name)
    }

    pub(crate) fn collection_names(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    /// Removes a collection. Returns `false` if it did not exist.
    pub(crate) fn drop_collection(&mut self, name: &str) -> bool {
        self.collections.shift_remove(name).is_some()
    }

    /// Replaces the named collections with their versions in `staged`.
    /// Collections `staged` no longer has are removed; all others are left
    /// untouched.
    pub(crate) fn merge_collections(&mut self, staged: &DatabaseState, names: &IndexSet<String>) {
        for name in names {
            match staged.collections.get(name) {
                Some(collection) => {
                    self.collections.insert(name.clone(), collection.clone());
                }
                None => {
                    self.collections.shift_remove(name);
                }
            }
        }
    }

    /// Executes an administrative command against this database.
    pub(crate) fn execute(&mut self, database: &str, command: &Document) -> MigrateResult<Document> {
        let name = command.first_key().ok_or_else(|| {
            MigrateError::new("command document is empty", ErrorKind::InvalidCommand)
        })?;

        match name {
            "ping" => Ok(ok_reply()),
            "create" => {
                let collection = required_str(command, "create")?;
                if self.collections.contains_key(collection) {
                    return Err(MigrateError::new(
                        &format!("Collection {}.{} already exists.", database, collection),
                        ErrorKind::InvalidCommand,
                    ));
                }
                self.collection_mut(collection);
                Ok(ok_reply())
            }
            "drop" => {
                let collection = required_str(command, "drop")?;
                if !self.drop_collection(collection) {
                    return Err(MigrateError::new(
                        &format!("ns not found: {}.{}", database, collection),
                        ErrorKind::NamespaceNotFound,
                    ));
                }
                Ok(ok_reply())
            }
            "insert" => {
                let collection = required_str(command, "insert")?;
                let namespace = format!("{}.{}", database, collection);
                let documents = required_array(command, "documents")?;
                let target = self.collection_mut(collection);
                let mut inserted = 0;
                for value in documents {
                    let document = as_document(value, "documents")?;
                    target.insert(&namespace, document.clone())?;
                    inserted += 1;
                }
                Ok(count_reply(inserted))
            }
            "delete" => {
                let collection = required_str(command, "delete")?;
                let deletes = required_array(command, "deletes")?;
                let mut removed = 0;
                for value in deletes {
                    let statement = as_document(value, "deletes")?;
                    let filter = required_document(statement, "q")?;
                    let limit_one = statement.get("limit").and_then(Value::as_i64) == Some(1);
                    removed += self.collection_mut(collection).delete(filter, limit_one);
                }
                Ok(count_reply(removed))
            }
            "update" => {
                let collection = required_str(command, "update")?;
                let namespace = format!("{}.{}", database, collection);
                let updates = required_array(command, "updates")?;
                let mut modified = 0;
                for value in updates {
                    let statement = as_document(value, "updates")?;
                    let filter = required_document(statement, "q")?;
                    let update = required_document(statement, "u")?;
                    let multi = statement.get("multi").and_then(Value::as_bool).unwrap_or(false);
                    modified += self
                        .collection_mut(collection)
                        .update(&namespace, filter, update, multi)?;
                }
                Ok(count_reply(modified))
            }
            "createIndexes" => {
                let collection = required_str(command, "createIndexes")?;
                let namespace = format!("{}.{}", database, collection);
                let indexes = required_array(command, "indexes")?;
                for value in indexes {
                    let model = as_document(value, "indexes")?;
                    let keys = required_document(model, "key")?;
                    let name = required_str(model, "name")?;
                    let unique = model.get("unique").and_then(Value::as_bool).unwrap_or(false);
                    self.collection_mut(collection).create_index(
                        &namespace,
                        IndexSpec {
                            name: name.to_string(),
                            keys: keys.clone(),
                            unique,
                        },
                    )?;
                }
                Ok(ok_reply())
            }
            "dropIndexes" => {
                let collection = required_str(command, "dropIndexes")?;
                let namespace = format!("{}.{}", database, collection);
                let index = required_str(command, "index")?;
                match self.collections.get_mut(collection) {
                    Some(target) => target.drop_index(&namespace, index)?,
                    None => {
                        return Err(MigrateError::new(
                            &format!("ns not found: {}", namespace),
                            ErrorKind::NamespaceNotFound,
                        ))
                    }
                }
                Ok(ok_reply())
            }
            "renameCollection" => {
                let source = collection_of(database, required_str(command, "renameCollection")?)?;
                let target = collection_of(database, required_str(command, "to")?)?;
                let drop_target = command.get("dropTarget").and_then(Value::as_bool).unwrap_or(false);
                if !self.collections.contains_key(&source) {
                    return Err(MigrateError::new(
                        &format!("source namespace does not exist: {}.{}", database, source),
                        ErrorKind::NamespaceNotFound,
                    ));
                }
                if self.collections.contains_key(&target) && !drop_target {
                    return Err(MigrateError::new(
                        &format!("target namespace exists: {}.{}", database, target),
                        ErrorKind::InvalidCommand,
                    ));
                }
                if let Some(state) = self.collections.shift_remove(&source) {
                    self.collections.insert(target, state);
                }
                Ok(ok_reply())
            }
            other => Err(MigrateError::new(
                &format!("no such command: '{}'", other),
                ErrorKind::CommandNotFound,
            )),
        }
    }
}

/// Names of the collections a command may create, modify or remove.
pub(crate) fn collections_written_by(database: &str, command: &Document) -> Vec<String> {
    match command.first_key() {
        None | Some("ping") => Vec::new(),
        Some("renameCollection") => ["renameCollection", "to"]
            .iter()
            .filter_map(|key| command.get(key).and_then(Value::as_str))
            .filter_map(|namespace| collection_of(database, namespace).ok())
            .collect(),
        Some(name) => command
            .get(name)
            .and_then(Value::as_str)
            .map(|collection| vec![collection.to_string()])
            .unwrap_or_default(),
    }
}

fn with_id(document: Document) -> Document {
    if document.contains_key(ID_FIELD) {
        return document;
    }
    with_given_id(document, Value::ObjectId(ObjectId::new()))
}

fn with_given_id(document: Document, id: Value) -> Document {
    std::iter::once((ID_FIELD.to_string(), id))
        .chain(document.into_iter().filter(|(k, _)| k != ID_FIELD))
        .collect()
}

fn apply_operators(document: &Document, update: &Document) -> MigrateResult<Document> {
    let mut next = document.clone();
    for (operator, argument) in update.iter() {
        let fields = argument.as_document().ok_or_else(|| {
            MigrateError::new(
                &format!("modifier {} expects a document", operator),
                ErrorKind::InvalidCommand,
            )
        })?;
        match operator {
            "$set" => {
                for (field, value) in fields.iter() {
                    next.put(field, value.clone())?;
                }
            }
            "$unset" => {
                for (field, _) in fields.iter() {
                    next.remove(field);
                }
            }
            other => {
                return Err(MigrateError::new(
                    &format!("unknown modifier: {}", other),
                    ErrorKind::InvalidCommand,
                ))
            }
        }
    }
    Ok(next)
}

/// Accepts `coll` or `db.coll` and rejects namespaces of other databases.
fn collection_of(database: &str, namespace: &str) -> MigrateResult<String> {
    match namespace.split_once('.') {
        Some((db, collection)) if db == database => Ok(collection.to_string()),
        Some((db, _)) => Err(MigrateError::new(
            &format!("cannot rename across databases ({} -> {})", database, db),
            ErrorKind::InvalidCommand,
        )),
        None => Ok(namespace.to_string()),
    }
}

fn duplicate_key(namespace: &str, index: &str, key: &[Value]) -> MigrateError {
    MigrateError::new(
        &format!(
            "E11000 duplicate key error collection: {} index: {} dup key: {:?}",
            namespace, index, key
        ),
        ErrorKind::DuplicateKey,
    )
}

fn ok_reply() -> Document {
    doc! { "ok": 1.0 }
}

fn count_reply(n: u64) -> Document {
    doc! { "n": (n as i64), "ok": 1.0 }
}

fn required_str<'a>(command: &'a Document, key: &str) -> MigrateResult<&'a str> {
    command.get(key).and_then(Value::as_str).ok_or_else(|| missing_field(key, "string"))
}

fn required_array<'a>(command: &'a Document, key: &str) -> MigrateResult<&'a [Value]> {
    command.get(key).and_then(Value::as_array).ok_or_else(|| missing_field(key, "array"))
}

fn required_document<'a>(command: &'a Document, key: &str) -> MigrateResult<&'a Document> {
    command
        .get(key)
        .and_then(Value::as_document)
        .ok_or_else(|| missing_field(key, "object"))
}

fn as_document<'a>(value: &'a Value, field: &str) -> MigrateResult<&'a Document> {
    value.as_document().ok_or_else(|| {
        MigrateError::new(
            &format!("elements of '{}' must be objects, found {}", field, value.type_name()),
            ErrorKind::InvalidCommand,
        )
    })
}

fn missing_field(key: &str, expected: &str) -> MigrateError {
    MigrateError::new(
        &format!("field '{}' must be of type {}", key, expected),
        ErrorKind::InvalidCommand,
    )
}
