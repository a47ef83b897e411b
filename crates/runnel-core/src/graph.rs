//! Logical pipeline graph: collections, transforms, and the arena that owns them.
//!
//! The graph is engine-agnostic. Translators (in `runnel-translate`) turn it
//! into a physical plan; nothing here knows about physical nodes.
//!
//! Collections and transforms live in two arenas indexed by their ids. A
//! collection consumed by several transforms is stored once; consumers refer
//! to it by `CollectionId`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coder::Coder;
use crate::error::{Error, Result};
use crate::id::{CollectionId, TransformId};
use crate::value::Value;
use crate::window::WindowFn;

/// Stable transform URNs. Translators register against these.
pub mod urn {
    pub const CREATE: &str = "runnel:transform:create:v1";
    pub const FLATTEN: &str = "runnel:transform:flatten:v1";
    pub const MAP: &str = "runnel:transform:map:v1";
    pub const FILTER: &str = "runnel:transform:filter:v1";
    pub const WINDOW_INTO: &str = "runnel:transform:window_into:v1";
}

/// Element-wise functions understood by the built-in `map` transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapFn {
    Identity,
    /// Integer addition; the element keeps its coder.
    Add(i64),
    /// Integer multiplication; the element keeps its coder.
    Mul(i64),
    /// Render the element as a string.
    Format,
    /// `x -> KV(x, 1)`.
    PairWithOne,
}

impl MapFn {
    /// Output coder for an input of `input`, or `None` if the function does not apply.
    pub fn output_coder(&self, input: &Coder) -> Option<Coder> {
        match self {
            MapFn::Identity => Some(input.clone()),
            MapFn::Add(_) | MapFn::Mul(_) => match input {
                Coder::Int32 | Coder::Int64 | Coder::Float64 => Some(input.clone()),
                _ => None,
            },
            MapFn::Format => Some(Coder::Utf8),
            MapFn::PairWithOne => Some(Coder::kv(input.clone(), Coder::Int64)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// `element OP operand`, evaluated by the `filter` operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub op: CmpOp,
    pub operand: Value,
}

impl Predicate {
    pub fn new(op: CmpOp, operand: Value) -> Self {
        Self { op, operand }
    }

    /// Parse `"> 5"`, `"!= foo"` and friends; the operand is typed by `coder`.
    pub fn parse(expr: &str, coder: &Coder) -> Option<Predicate> {
        let expr = expr.trim();
        // Two-character operators first so "<=" is not read as "<".
        const OPS: [(&str, CmpOp); 6] = [
            ("==", CmpOp::Eq),
            ("!=", CmpOp::Ne),
            ("<=", CmpOp::Le),
            (">=", CmpOp::Ge),
            ("<", CmpOp::Lt),
            (">", CmpOp::Gt),
        ];
        let (sym, op) = OPS.iter().find(|(sym, _)| expr.starts_with(sym))?;
        let literal = expr[sym.len()..].trim();
        let operand = match coder {
            Coder::Boolean => Value::Bool(literal.parse().ok()?),
            Coder::Int32 => Value::I32(literal.parse().ok()?),
            Coder::Int64 => Value::I64(literal.parse().ok()?),
            Coder::Float64 => Value::F64(literal.parse().ok()?),
            Coder::Utf8 => Value::Str(literal.to_string()),
            _ => return None,
        };
        Some(Predicate { op: *op, operand })
    }
}

/// What a transform node does. Dispatch to translators goes through `urn()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transform {
    Create { values: Vec<Value> },
    Flatten,
    Map { func: MapFn },
    Filter { predicate: Predicate },
    WindowInto { window: WindowFn },
    /// Transform kinds defined outside this crate.
    Custom {
        urn: String,
        payload: serde_json::Value,
    },
}

impl Transform {
    pub fn urn(&self) -> &str {
        match self {
            Transform::Create { .. } => urn::CREATE,
            Transform::Flatten => urn::FLATTEN,
            Transform::Map { .. } => urn::MAP,
            Transform::Filter { .. } => urn::FILTER,
            Transform::WindowInto { .. } => urn::WINDOW_INTO,
            Transform::Custom { urn, .. } => urn,
        }
    }

    /// Short name used for default labels.
    pub fn name(&self) -> &str {
        match self {
            Transform::Create { .. } => "Create",
            Transform::Flatten => "Flatten",
            Transform::Map { .. } => "Map",
            Transform::Filter { .. } => "Filter",
            Transform::WindowInto { .. } => "WindowInto",
            Transform::Custom { .. } => "Custom",
        }
    }
}

/// A typed logical stream of elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub coder: Coder,
    pub window: WindowFn,
    /// `None` for declared placeholders that an external source must bind.
    pub producer: Option<TransformId>,
    pub consumers: Vec<TransformId>,
}

impl Collection {
    pub fn is_leaf(&self) -> bool {
        self.consumers.is_empty()
    }
}

/// Ordered references to collections. Owns nothing but ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionList(Vec<CollectionId>);

impl CollectionList {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn of(first: CollectionId) -> Self {
        Self(vec![first])
    }

    pub fn and(mut self, next: CollectionId) -> Self {
        self.0.push(next);
        self
    }

    pub fn as_slice(&self) -> &[CollectionId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CollectionId> + '_ {
        self.0.iter().copied()
    }
}

impl From<Vec<CollectionId>> for CollectionList {
    fn from(ids: Vec<CollectionId>) -> Self {
        Self(ids)
    }
}

impl FromIterator<CollectionId> for CollectionList {
    fn from_iter<I: IntoIterator<Item = CollectionId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One application of a transform: inputs in order, one output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformNode {
    pub id: TransformId,
    pub label: String,
    pub transform: Transform,
    pub inputs: CollectionList,
    pub output: CollectionId,
}

/// The logical graph. Collections and transforms are appended, never removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    collections: Vec<Collection>,
    transforms: Vec<TransformNode>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: Vec::new(),
            transforms: Vec::new(),
        }
    }

    pub fn collection(&self, id: CollectionId) -> Result<&Collection> {
        self.collections
            .get(id.index())
            .ok_or(Error::UnknownCollection(id))
    }

    pub fn transform(&self, id: TransformId) -> Result<&TransformNode> {
        self.transforms
            .get(id.index())
            .ok_or(Error::UnknownTransform(id))
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn transforms(&self) -> &[TransformNode] {
        &self.transforms
    }

    /// Terminal collections (no consumers), in id order.
    pub fn leaves(&self) -> Vec<CollectionId> {
        self.collections
            .iter()
            .filter(|c| c.is_leaf())
            .map(|c| c.id)
            .collect()
    }

    /// Apply `transform` to `inputs`, producing a new collection of `coder`.
    pub fn apply(
        &mut self,
        transform: Transform,
        inputs: impl Into<CollectionList>,
        coder: Coder,
    ) -> Result<CollectionId> {
        let label = format!("{}{}", transform.name(), self.transforms.len());
        self.apply_named(label, transform, inputs, coder)
    }

    pub fn apply_named(
        &mut self,
        label: impl Into<String>,
        transform: Transform,
        inputs: impl Into<CollectionList>,
        coder: Coder,
    ) -> Result<CollectionId> {
        let inputs = inputs.into();
        for input in inputs.iter() {
            self.collection(input)?;
        }
        let window = match &transform {
            Transform::WindowInto { window } => *window,
            _ => match inputs.iter().next() {
                Some(first) => self.collection(first)?.window,
                None => WindowFn::Global,
            },
        };
        let output = self.declare(coder, window);
        self.attach(label.into(), transform, inputs, output);
        Ok(output)
    }

    /// Declare a collection without a producer. It must later be bound via
    /// [`Pipeline::produce_into`] or registered as an external source at
    /// translation time.
    pub fn declare(&mut self, coder: Coder, window: WindowFn) -> CollectionId {
        let id = CollectionId::from_index(self.collections.len());
        self.collections.push(Collection {
            id,
            coder,
            window,
            producer: None,
            consumers: Vec::new(),
        });
        id
    }

    /// Make `transform` the producer of an already declared collection.
    ///
    /// Unlike [`Pipeline::apply`], `inputs` may refer to `output` or its
    /// descendants, so this is the one way a cycle can enter the graph.
    pub fn produce_into(
        &mut self,
        transform: Transform,
        inputs: impl Into<CollectionList>,
        output: CollectionId,
    ) -> Result<TransformId> {
        let inputs = inputs.into();
        for input in inputs.iter() {
            self.collection(input)?;
        }
        if let Some(producer) = self.collection(output)?.producer {
            return Err(Error::AlreadyProduced {
                collection: output,
                producer,
            });
        }
        let label = format!("{}{}", transform.name(), self.transforms.len());
        Ok(self.attach(label, transform, inputs, output))
    }

    pub fn create(&mut self, values: Vec<Value>, coder: Coder) -> Result<CollectionId> {
        self.apply(Transform::Create { values }, CollectionList::empty(), coder)
    }

    /// Union `inputs`. The coder is taken from the first input unless given;
    /// an empty list requires it.
    pub fn flatten(&mut self, inputs: &CollectionList, coder: Option<Coder>) -> Result<CollectionId> {
        let coder = match (coder, inputs.iter().next()) {
            (Some(c), _) => c,
            (None, Some(first)) => self.collection(first)?.coder.clone(),
            (None, None) => return Err(Error::MissingCoder),
        };
        self.apply(Transform::Flatten, inputs.clone(), coder)
    }

    pub fn map(&mut self, input: CollectionId, func: MapFn) -> Result<CollectionId> {
        let in_coder = self.collection(input)?.coder.clone();
        // An inapplicable function keeps the input coder; the map translator rejects it.
        let coder = func.output_coder(&in_coder).unwrap_or(in_coder);
        self.apply(Transform::Map { func }, CollectionList::of(input), coder)
    }

    pub fn filter(&mut self, input: CollectionId, predicate: Predicate) -> Result<CollectionId> {
        let coder = self.collection(input)?.coder.clone();
        self.apply(Transform::Filter { predicate }, CollectionList::of(input), coder)
    }

    pub fn window_into(&mut self, input: CollectionId, window: WindowFn) -> Result<CollectionId> {
        let coder = self.collection(input)?.coder.clone();
        self.apply(Transform::WindowInto { window }, CollectionList::of(input), coder)
    }

    fn attach(
        &mut self,
        label: String,
        transform: Transform,
        inputs: CollectionList,
        output: CollectionId,
    ) -> TransformId {
        let id = TransformId::from_index(self.transforms.len());
        for input in inputs.iter() {
            let consumers = &mut self.collections[input.index()].consumers;
            if !consumers.contains(&id) {
                consumers.push(id);
            }
        }
        self.collections[output.index()].producer = Some(id);
        self.transforms.push(TransformNode {
            id,
            label,
            transform,
            inputs,
            output,
        });
        id
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pipeline {}", self.name)?;
        for t in &self.transforms {
            let inputs: Vec<String> = t.inputs.iter().map(|c| c.get().to_string()).collect();
            writeln!(
                f,
                "  {} [{}] ({}) -> {}",
                t.label,
                t.transform.urn(),
                inputs.join(", "),
                t.output.get()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(range: std::ops::RangeInclusive<i64>) -> Vec<Value> {
        range.map(Value::I64).collect()
    }

    #[test]
    fn apply_records_producers_and_consumers() {
        let mut p = Pipeline::new("t");
        let a = p.create(ints(1..=3), Coder::Int64).unwrap();
        let b = p.create(ints(4..=6), Coder::Int64).unwrap();
        let m = p.flatten(&CollectionList::of(a).and(b), None).unwrap();

        let merged = p.collection(m).unwrap();
        assert_eq!(merged.coder, Coder::Int64);
        let producer = p.transform(merged.producer.unwrap()).unwrap();
        assert_eq!(producer.transform, Transform::Flatten);
        assert_eq!(producer.inputs.as_slice(), &[a, b]);
        assert_eq!(p.collection(a).unwrap().consumers, vec![producer.id]);
        assert_eq!(p.leaves(), vec![m]);
    }

    #[test]
    fn empty_flatten_requires_coder() {
        let mut p = Pipeline::new("t");
        assert!(matches!(
            p.flatten(&CollectionList::empty(), None),
            Err(Error::MissingCoder)
        ));
        let e = p.flatten(&CollectionList::empty(), Some(Coder::Utf8)).unwrap();
        assert_eq!(p.collection(e).unwrap().coder, Coder::Utf8);
    }

    #[test]
    fn apply_rejects_forward_references() {
        let mut p = Pipeline::new("t");
        let missing = CollectionId::new(7);
        assert!(matches!(
            p.flatten(&CollectionList::of(missing), Some(Coder::Int64)),
            Err(Error::UnknownCollection(id)) if id == missing
        ));
        assert!(p.transforms().is_empty());
    }

    #[test]
    fn produce_into_binds_once() {
        let mut p = Pipeline::new("t");
        let slot = p.declare(Coder::Int64, WindowFn::Global);
        let src = p.create(ints(1..=2), Coder::Int64).unwrap();
        p.produce_into(Transform::Flatten, CollectionList::of(src), slot)
            .unwrap();
        assert!(matches!(
            p.produce_into(Transform::Flatten, CollectionList::of(src), slot),
            Err(Error::AlreadyProduced { collection, .. }) if collection == slot
        ));
    }

    #[test]
    fn window_into_changes_downstream_windowing() {
        let mut p = Pipeline::new("t");
        let a = p.create(ints(1..=2), Coder::Int64).unwrap();
        let w = p.window_into(a, WindowFn::Fixed { size_ms: 60_000 }).unwrap();
        let m = p.map(w, MapFn::Add(1)).unwrap();
        assert_eq!(p.collection(m).unwrap().window, WindowFn::Fixed { size_ms: 60_000 });
        assert_eq!(p.collection(a).unwrap().window, WindowFn::Global);
    }

    #[test]
    fn predicate_parse() {
        let p = Predicate::parse(">= 10", &Coder::Int64).unwrap();
        assert_eq!(p, Predicate::new(CmpOp::Ge, Value::I64(10)));
        assert_eq!(Predicate::parse("~ 1", &Coder::Int64), None);
        assert_eq!(Predicate::parse("< x", &Coder::Int64), None);
    }
}
