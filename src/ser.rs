//! Serialization of [`Value`] trees and Rust data structures into
//! lenient JSON text.
//!
//! ## Overview
//!
//! Writing is a recursive walk over the value shape:
//!
//! - **Sinks**: output goes through the [`Sink`] trait, so in-memory
//!   and `io::Write` targets produce byte-identical text
//! - **Explicit context**: all per-write state (configuration, depth,
//!   loop guard) lives in a [`WriteContext`] passed down the walk; no
//!   global or thread-local state is involved
//! - **Loop detection**: container identities are pushed onto a
//!   [`LoopGuard`] stack on entry and popped on exit; re-entering a
//!   live identity reports [`Error::DataStructureLoop`] with the full
//!   frame stack and a rendered path
//!
//! ## Usage
//!
//! ```rust
//! use laxjson::to_string;
//!
//! let text = to_string(&vec![1, 2, 3]).unwrap();
//! assert_eq!(text, "[1,2,3]");
//! ```

use std::io;

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{ser, Serialize};

use crate::escape::{escape_property_name, escape_string};
use crate::options::DuplicateKeys;
use crate::pairs::PairList;
use crate::{Error, JsonConfig, JsonMap, LoopFrame, Result, Value};

/// Output abstraction for the writer. In-memory and streaming targets
/// share every formatting decision.
pub trait Sink {
    /// Appends a string fragment.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] for streaming targets.
    fn write_str(&mut self, s: &str) -> Result<()>;

    /// Appends a single character.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] for streaming targets.
    fn write_char(&mut self, c: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.write_str(c.encode_utf8(&mut buf))
    }
}

impl Sink for String {
    fn write_str(&mut self, s: &str) -> Result<()> {
        self.push_str(s);
        Ok(())
    }

    fn write_char(&mut self, c: char) -> Result<()> {
        self.push(c);
        Ok(())
    }
}

/// Adapts any [`io::Write`] into a [`Sink`].
pub struct IoSink<W: io::Write> {
    writer: W,
}

impl<W: io::Write> IoSink<W> {
    pub fn new(writer: W) -> Self {
        IoSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> Sink for IoSink<W> {
    fn write_str(&mut self, s: &str) -> Result<()> {
        self.writer.write_all(s.as_bytes()).map_err(Error::io)
    }
}

/// Structural shape of a value, decided once per node. The writer
/// dispatches on the shape; only sequences and pairs carry a
/// loop-guard identity.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    Scalar(&'a Value),
    Date(&'a DateTime<Utc>),
    Sequence(&'a [Value]),
    Pairs(&'a JsonMap),
}

impl<'a> Shape<'a> {
    #[must_use]
    pub fn of(value: &'a Value) -> Shape<'a> {
        match value {
            Value::Array(items) => Shape::Sequence(items),
            Value::Object(map) => Shape::Pairs(map),
            Value::Date(dt) => Shape::Date(dt),
            other => Shape::Scalar(other),
        }
    }
}

#[derive(Debug, Clone)]
struct GuardFrame {
    identity: usize,
    type_name: String,
}

/// Stack of live container identities along the current write path.
///
/// Push and pop must pair LIFO; a violated discipline is reported as
/// [`Error::LoopGuardFault`] rather than silently tolerated.
#[derive(Debug, Default)]
pub struct LoopGuard {
    frames: Vec<GuardFrame>,
}

impl LoopGuard {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    fn push(&mut self, identity: usize, type_name: &str, path: &str) -> Result<()> {
        if let Some(duplicate) = self
            .frames
            .iter()
            .position(|frame| frame.identity == identity)
        {
            let frames = self
                .frames
                .iter()
                .map(|frame| LoopFrame {
                    type_name: frame.type_name.clone(),
                    identity: frame.identity,
                })
                .collect();
            return Err(Error::DataStructureLoop {
                type_name: type_name.to_string(),
                frames,
                duplicate,
                path: path.to_string(),
            });
        }
        self.frames.push(GuardFrame {
            identity,
            type_name: type_name.to_string(),
        });
        Ok(())
    }

    fn pop(&mut self, identity: usize) -> Result<()> {
        match self.frames.pop() {
            Some(frame) if frame.identity == identity => Ok(()),
            Some(frame) => Err(Error::LoopGuardFault(format!(
                "popped {} but the top of the guard stack was {}",
                identity, frame.identity
            ))),
            None => Err(Error::LoopGuardFault(
                "popped an empty guard stack".to_string(),
            )),
        }
    }
}

/// Per-write state threaded through the recursive walk.
pub struct WriteContext<'a> {
    config: &'a JsonConfig,
    guard: LoopGuard,
    path: Vec<String>,
    depth: usize,
}

impl<'a> WriteContext<'a> {
    #[must_use]
    pub fn new(config: &'a JsonConfig) -> Self {
        WriteContext {
            config,
            guard: LoopGuard::default(),
            path: Vec::new(),
            depth: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &JsonConfig {
        self.config
    }

    #[must_use]
    pub fn guard(&self) -> &LoopGuard {
        &self.guard
    }

    /// Rendered path from the root to the current position, `$` when at
    /// the root.
    #[must_use]
    pub fn rendered_path(&self) -> String {
        let mut path = String::from("$");
        for segment in &self.path {
            path.push_str(segment);
        }
        path
    }

    /// Drops all accumulated state so the context can be reused after a
    /// failed write.
    pub fn reset(&mut self) {
        self.guard.clear();
        self.path.clear();
        self.depth = 0;
    }

    /// Registers entry into a container with the given identity.
    ///
    /// # Errors
    ///
    /// [`Error::DataStructureLoop`] when the identity is already live,
    /// [`Error::DepthExceeded`] past the configured nesting limit.
    pub fn enter(&mut self, identity: usize, type_name: &str) -> Result<()> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            return Err(Error::DepthExceeded(self.config.max_depth));
        }
        if self.config.detect_loops {
            let path = self.rendered_path();
            self.guard.push(identity, type_name, &path)?;
        }
        Ok(())
    }

    /// Registers exit from a container previously passed to [`enter`].
    ///
    /// # Errors
    ///
    /// [`Error::LoopGuardFault`] when the identity does not match the
    /// top of the guard stack.
    ///
    /// [`enter`]: WriteContext::enter
    pub fn exit(&mut self, identity: usize) -> Result<()> {
        self.depth = self.depth.saturating_sub(1);
        if self.config.detect_loops {
            self.guard.pop(identity)?;
        }
        Ok(())
    }

    pub fn push_segment(&mut self, segment: String) {
        self.path.push(segment);
    }

    pub fn pop_segment(&mut self) {
        self.path.pop();
    }
}

/// Types that can write themselves as lenient JSON through a
/// [`WriteContext`].
///
/// Container implementors must bracket child writes with
/// [`WriteContext::enter`] and [`WriteContext::exit`] using a stable
/// identity (typically the container's address) so that reference
/// cycles are detected.
pub trait ToJson {
    /// Writes `self` to the sink.
    ///
    /// # Errors
    ///
    /// Formatting, policy, and loop errors per [`Error`].
    fn to_json(&self, ctx: &mut WriteContext, sink: &mut dyn Sink) -> Result<()>;
}

impl ToJson for Value {
    fn to_json(&self, ctx: &mut WriteContext, sink: &mut dyn Sink) -> Result<()> {
        write_value_into(self, ctx, sink)
    }
}

/// Serializes a [`Value`] to a string with the default configuration.
///
/// # Errors
///
/// Formatting, policy, and loop errors per [`Error`].
pub fn write_value(value: &Value) -> Result<String> {
    write_value_with_config(value, &JsonConfig::default())
}

/// Serializes a [`Value`] to a string with an explicit configuration.
///
/// # Errors
///
/// Formatting, policy, and loop errors per [`Error`].
pub fn write_value_with_config(value: &Value, config: &JsonConfig) -> Result<String> {
    let mut out = String::new();
    let mut ctx = WriteContext::new(config);
    write_value_into(value, &mut ctx, &mut out).map_err(|err| {
        ctx.reset();
        err
    })?;
    Ok(out)
}

/// Serializes a [`Value`] into an [`io::Write`] target, producing
/// exactly the bytes [`write_value_with_config`] would.
///
/// # Errors
///
/// [`Error::Io`] on write failure, otherwise as
/// [`write_value_with_config`].
pub fn write_value_to<W: io::Write>(value: &Value, writer: W, config: &JsonConfig) -> Result<()> {
    let mut sink = IoSink::new(writer);
    let mut ctx = WriteContext::new(config);
    write_value_into(value, &mut ctx, &mut sink).map_err(|err| {
        ctx.reset();
        err
    })
}

/// Recursive writer entry point for [`ToJson`] implementors.
///
/// # Errors
///
/// Formatting, policy, and loop errors per [`Error`].
pub fn write_value_into(value: &Value, ctx: &mut WriteContext, sink: &mut dyn Sink) -> Result<()> {
    match Shape::of(value) {
        Shape::Scalar(v) => write_scalar(v, ctx.config(), sink),
        Shape::Date(dt) => {
            sink.write_str("new Date(")?;
            sink.write_str(&dt.timestamp_millis().to_string())?;
            sink.write_str(")")
        }
        Shape::Sequence(items) => write_array(items, ctx, sink),
        Shape::Pairs(map) => write_object(map, ctx, sink),
    }
}

fn write_scalar(value: &Value, config: &JsonConfig, sink: &mut dyn Sink) -> Result<()> {
    match value {
        Value::Null => sink.write_str("null"),
        Value::Bool(true) => sink.write_str("true"),
        Value::Bool(false) => sink.write_str("false"),
        Value::Int(i) => sink.write_str(&i.to_string()),
        Value::BigInt(bi) => sink.write_str(&bi.to_string()),
        Value::Float(f) => sink.write_str(&format_f64(*f)),
        Value::BigDecimal(bd) => sink.write_str(&bd.to_string()),
        Value::String(s) => write_string(s, config, sink),
        // Containers and dates never classify as scalars.
        other => Err(Error::custom(format!("not a scalar: {}", other.type_name()))),
    }
}

// Floats keep a decimal marker so the value round-trips as a float;
// non-finite values have no JSON spelling and degrade to null.
fn format_f64(f: f64) -> String {
    if !f.is_finite() {
        return "null".to_string();
    }
    if f == f.trunc() {
        // Exponent form past the contiguous-integer range, so the text
        // still carries a float marker.
        return if f.abs() < 1e16 {
            format!("{f:.1}")
        } else {
            format!("{f:e}")
        };
    }
    f.to_string()
}

fn write_string(s: &str, config: &JsonConfig, sink: &mut dyn Sink) -> Result<()> {
    let quote = config.quote.as_char();
    sink.write_char(quote)?;
    sink.write_str(&escape_string(s, config)?)?;
    sink.write_char(quote)
}

fn write_property_name(name: &str, config: &JsonConfig, sink: &mut dyn Sink) -> Result<()> {
    if config.validate_property_names {
        let quote = config.quote.as_char();
        sink.write_char(quote)?;
        sink.write_str(&escape_property_name(name, config)?)?;
        sink.write_char(quote)
    } else {
        write_string(name, config, sink)
    }
}

fn write_array(items: &[Value], ctx: &mut WriteContext, sink: &mut dyn Sink) -> Result<()> {
    let identity = items.as_ptr() as usize;
    ctx.enter(identity, "array")?;
    sink.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            sink.write_str(",")?;
        }
        ctx.push_segment(format!("[{i}]"));
        let result = write_value_into(item, ctx, sink);
        ctx.pop_segment();
        result?;
    }
    sink.write_str("]")?;
    ctx.exit(identity)
}

fn write_object(map: &JsonMap, ctx: &mut WriteContext, sink: &mut dyn Sink) -> Result<()> {
    let identity = map as *const JsonMap as usize;
    ctx.enter(identity, "object")?;
    sink.write_str("{")?;
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            sink.write_str(",")?;
        }
        write_property_name(key, ctx.config(), sink)?;
        sink.write_str(":")?;
        ctx.push_segment(format!(".{key}"));
        let result = write_value_into(value, ctx, sink);
        ctx.pop_segment();
        result?;
    }
    sink.write_str("}")?;
    ctx.exit(identity)
}

/// Writes an ordered pair list as a JSON object.
///
/// Repeated keys follow the configured duplicate-key policy: under
/// last-wins the later value replaces the earlier one in its original
/// position, under fail the repeated key is reported.
///
/// # Errors
///
/// [`Error::DuplicateProperty`] under the fail policy, otherwise
/// formatting, policy, and loop errors per [`Error`].
pub fn write_pairs(
    pairs: &dyn PairList,
    ctx: &mut WriteContext,
    sink: &mut dyn Sink,
) -> Result<()> {
    let mut members: Vec<(&str, &Value)> = Vec::with_capacity(pairs.len());
    for (key, value) in pairs.pairs() {
        match members.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => {
                if ctx.config().duplicate_keys == DuplicateKeys::Fail {
                    return Err(Error::DuplicateProperty(key.clone()));
                }
                slot.1 = value;
            }
            None => members.push((key, value)),
        }
    }

    let identity = pairs.pairs().as_ptr() as usize;
    ctx.enter(identity, "pairs")?;
    sink.write_str("{")?;
    for (i, (key, value)) in members.iter().enumerate() {
        if i > 0 {
            sink.write_str(",")?;
        }
        write_property_name(key, ctx.config(), sink)?;
        sink.write_str(":")?;
        ctx.push_segment(format!(".{key}"));
        let result = write_value_into(value, ctx, sink);
        ctx.pop_segment();
        result?;
    }
    sink.write_str("}")?;
    ctx.exit(identity)
}

/// Serializes any `Serialize` type to lenient JSON text with the
/// default configuration.
///
/// # Errors
///
/// As [`to_value`] and [`write_value`].
pub fn to_string<T: Serialize>(value: &T) -> Result<String> {
    write_value(&to_value(value)?)
}

/// Serializes any `Serialize` type with an explicit configuration.
///
/// # Errors
///
/// As [`to_value`] and [`write_value_with_config`].
pub fn to_string_with_config<T: Serialize>(value: &T, config: &JsonConfig) -> Result<String> {
    write_value_with_config(&to_value(value)?, config)
}

/// Serializes any `Serialize` type into an [`io::Write`] target.
///
/// # Errors
///
/// As [`to_value`] and [`write_value_to`].
pub fn to_writer<W: io::Write, T: Serialize>(
    writer: W,
    value: &T,
    config: &JsonConfig,
) -> Result<()> {
    write_value_to(&to_value(value)?, writer, config)
}

/// Converts any `Serialize` type into a [`Value`] tree.
///
/// # Errors
///
/// [`Error::Message`] when the type cannot be represented.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    value.serialize(ValueSerializer)
}

/// Serde serializer producing [`Value`] trees.
pub struct ValueSerializer;

pub struct SerializeVec {
    vec: Vec<Value>,
}

pub struct SerializeTaggedVec {
    variant: &'static str,
    vec: Vec<Value>,
}

pub struct SerializeMap {
    map: JsonMap,
    current_key: Option<String>,
}

pub struct SerializeTaggedMap {
    variant: &'static str,
    map: JsonMap,
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeTaggedVec;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeTaggedMap;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        Ok(match i64::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::BigInt(BigInt::from(v)),
        })
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        Ok(match i64::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::BigInt(BigInt::from(v)),
        })
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::Float(v as f64))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        let vec = v.iter().map(|&b| Value::Int(b as i64)).collect();
        Ok(Value::Array(vec))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        let mut map = JsonMap::new();
        map.insert(variant.to_string(), value.serialize(ValueSerializer)?);
        Ok(Value::Object(map))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<SerializeVec> {
        Ok(SerializeVec::new())
    }

    fn serialize_tuple(self, _len: usize) -> Result<SerializeVec> {
        Ok(SerializeVec::new())
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<SerializeVec> {
        Ok(SerializeVec::new())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<SerializeTaggedVec> {
        Ok(SerializeTaggedVec {
            variant,
            vec: Vec::new(),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<SerializeMap> {
        Ok(SerializeMap::new())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<SerializeMap> {
        Ok(SerializeMap::new())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<SerializeTaggedMap> {
        Ok(SerializeTaggedMap {
            variant,
            map: JsonMap::new(),
        })
    }
}

impl SerializeVec {
    fn new() -> Self {
        SerializeVec { vec: Vec::new() }
    }
}

impl SerializeMap {
    fn new() -> Self {
        SerializeMap {
            map: JsonMap::new(),
            current_key: None,
        }
    }
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.vec.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Array(self.vec))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.vec.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Array(self.vec))
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.vec.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Array(self.vec))
    }
}

impl ser::SerializeTupleVariant for SerializeTaggedVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.vec.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        let mut map = JsonMap::new();
        map.insert(self.variant.to_string(), Value::Array(self.vec));
        Ok(Value::Object(map))
    }
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match to_value(key)? {
            Value::String(s) => {
                self.current_key = Some(s);
                Ok(())
            }
            _ => Err(Error::custom("map keys must be strings")),
        }
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called without serialize_key"))?;
        self.map.insert(key, to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Object(self.map))
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.map.insert(key.to_string(), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Object(self.map))
    }
}

impl ser::SerializeStructVariant for SerializeTaggedMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.map.insert(key.to_string(), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        let mut map = JsonMap::new();
        map.insert(self.variant.to_string(), Value::Object(self.map));
        Ok(Value::Object(map))
    }
}
