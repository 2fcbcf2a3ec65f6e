// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The naive buffer format: two schema-free little-endian streams.
//!
//! ```text
//! __model__.nb   "LTNB" u16 version
//!                u64 vars  { str name, u8 dtype, u8 persistable }
//!                u64 ops   { str type, u8 placed, u8 target, u8 precision, u8 layout,
//!                            inputs, outputs: u64 slots { str slot, u64 n, str names.. }
//!                            u64 attrs { str name, u8 tag, value } }
//!
//! param.nb       "LTNP" u16 version
//!                u64 records { str name, u64 rank, u64 dims..,
//!                              u64 lod levels { u64 n, u64 offsets.. },
//!                              u8 dtype, u64 byte length, bytes }
//! ```
//!
//! Strings are a `u64` length followed by UTF-8 bytes. The reader works on
//! any [`ByteSource`], so files are parsed straight from their mapping.

use crate::byte_source::{ByteSource, MemorySource, MmapSource};
use crate::codec::{Reader, Writer};
use crate::params::{bind_params, persistable_tensors};
use crate::ModelIoError;
use model_ir::{Attribute, OpDesc, Program, ProgramState, Scope, Validated, VarDesc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tensor_core::{DataLayout, Lod, Place, Precision, Shape, Target, Tensor};

/// Program stream file name.
pub const MODEL_FILE: &str = "__model__.nb";
/// Parameter stream file name.
pub const PARAM_FILE: &str = "param.nb";

const MODEL_MAGIC: &[u8; 4] = b"LTNB";
const PARAM_MAGIC: &[u8; 4] = b"LTNP";
const VERSION: u16 = 1;

/// Where a naive buffer model comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NaiveSource {
    Files { model: PathBuf, params: PathBuf },
    Memory { model: Vec<u8>, params: Vec<u8> },
}

impl NaiveSource {
    /// The default file pair inside `dir`.
    pub fn dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::Files {
            model: dir.join(MODEL_FILE),
            params: dir.join(PARAM_FILE),
        }
    }

    fn open(&self) -> Result<(Box<dyn ByteSource>, Box<dyn ByteSource>), ModelIoError> {
        Ok(match self {
            Self::Files { model, params } => (
                Box::new(MmapSource::open(model)?),
                Box::new(MmapSource::open(params)?),
            ),
            Self::Memory { model, params } => (
                Box::new(MemorySource::new(MODEL_FILE, model.clone())),
                Box::new(MemorySource::new(PARAM_FILE, params.clone())),
            ),
        })
    }
}

/// Encoded program and parameter streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaiveBuffers {
    pub model: Vec<u8>,
    pub params: Vec<u8>,
}

impl From<NaiveBuffers> for NaiveSource {
    fn from(b: NaiveBuffers) -> Self {
        Self::Memory {
            model: b.model,
            params: b.params,
        }
    }
}

// ── Program stream ─────────────────────────────────────────────────

fn write_slots(w: &mut Writer, slots: &BTreeMap<String, Vec<String>>) {
    w.len(slots.len());
    for (slot, names) in slots {
        w.string(slot);
        w.len(names.len());
        for name in names {
            w.string(name);
        }
    }
}

fn write_attr(w: &mut Writer, attr: &Attribute) {
    w.u8(attr.tag());
    match attr {
        Attribute::Int(v) => w.i32(*v),
        Attribute::Float(v) => w.f32(*v),
        Attribute::String(v) => w.string(v),
        Attribute::Ints(v) => {
            w.len(v.len());
            v.iter().for_each(|x| w.i32(*x));
        }
        Attribute::Floats(v) => {
            w.len(v.len());
            v.iter().for_each(|x| w.f32(*x));
        }
        Attribute::Strings(v) => {
            w.len(v.len());
            v.iter().for_each(|x| w.string(x));
        }
        Attribute::Bool(v) => w.u8(u8::from(*v)),
        Attribute::Long(v) => w.i64(*v),
        Attribute::Longs(v) => {
            w.len(v.len());
            v.iter().for_each(|x| w.i64(*x));
        }
    }
}

/// Encodes the program stream.
pub fn encode_program<S: ProgramState>(program: &Program<S>) -> Vec<u8> {
    let mut w = Writer::new();
    w.magic(MODEL_MAGIC, VERSION);

    w.len(program.vars().len());
    for var in program.vars() {
        w.string(&var.name);
        w.u8(var.dtype.tag());
        w.u8(u8::from(var.persistable));
    }

    w.len(program.ops().len());
    for op in program.ops() {
        w.string(&op.op_type);
        let place = op.place.unwrap_or_else(Place::any);
        w.u8(u8::from(op.place.is_some()));
        w.u8(place.target.tag());
        w.u8(place.precision.tag());
        w.u8(place.layout.tag());
        write_slots(&mut w, &op.inputs);
        write_slots(&mut w, &op.outputs);
        w.len(op.attrs.len());
        for (name, attr) in &op.attrs {
            w.string(name);
            write_attr(&mut w, attr);
        }
    }
    w.into_inner()
}

fn read_slots(r: &mut Reader<'_>) -> Result<BTreeMap<String, Vec<String>>, ModelIoError> {
    let n = r.len(16)?;
    let mut slots = BTreeMap::new();
    for _ in 0..n {
        let slot = r.string()?;
        let count = r.len(8)?;
        let names = (0..count).map(|_| r.string()).collect::<Result<Vec<_>, _>>()?;
        slots.insert(slot, names);
    }
    Ok(slots)
}

fn read_attr(r: &mut Reader<'_>) -> Result<Attribute, ModelIoError> {
    let tag = r.u8()?;
    Ok(match tag {
        0 => Attribute::Int(r.i32()?),
        1 => Attribute::Float(r.f32()?),
        2 => Attribute::String(r.string()?),
        3 => {
            let n = r.len(4)?;
            Attribute::Ints((0..n).map(|_| r.i32()).collect::<Result<_, _>>()?)
        }
        4 => {
            let n = r.len(4)?;
            Attribute::Floats((0..n).map(|_| r.f32()).collect::<Result<_, _>>()?)
        }
        5 => {
            let n = r.len(8)?;
            Attribute::Strings((0..n).map(|_| r.string()).collect::<Result<_, _>>()?)
        }
        6 => Attribute::Bool(r.u8()? != 0),
        7 => Attribute::Long(r.i64()?),
        8 => {
            let n = r.len(8)?;
            Attribute::Longs((0..n).map(|_| r.i64()).collect::<Result<_, _>>()?)
        }
        other => return Err(r.corrupt(format!("unknown attribute tag {other}"))),
    })
}

fn read_place(r: &mut Reader<'_>) -> Result<Option<Place>, ModelIoError> {
    let placed = r.u8()? != 0;
    let (t, p, l) = (r.u8()?, r.u8()?, r.u8()?);
    if !placed {
        return Ok(None);
    }
    match (Target::from_tag(t), Precision::from_tag(p), DataLayout::from_tag(l)) {
        (Some(t), Some(p), Some(l)) => Ok(Some(Place::with_layout(t, p, l))),
        _ => Err(r.corrupt(format!("unknown place tags ({t}, {p}, {l})"))),
    }
}

/// Decodes and validates a program stream.
pub fn decode_program(stream: &str, bytes: &[u8]) -> Result<Program<Validated>, ModelIoError> {
    let mut r = Reader::new(stream, bytes);
    r.magic(MODEL_MAGIC, VERSION)?;

    let num_vars = r.len(10)?;
    let mut vars = Vec::with_capacity(num_vars);
    for _ in 0..num_vars {
        let name = r.string()?;
        let dtype = r.dtype()?;
        let persistable = r.u8()? != 0;
        vars.push(VarDesc {
            name,
            dtype,
            persistable,
        });
    }

    let num_ops = r.len(36)?;
    let mut ops = Vec::with_capacity(num_ops);
    for _ in 0..num_ops {
        let mut op = OpDesc::new(r.string()?);
        op.place = read_place(&mut r)?;
        op.inputs = read_slots(&mut r)?;
        op.outputs = read_slots(&mut r)?;
        let num_attrs = r.len(9)?;
        for _ in 0..num_attrs {
            let name = r.string()?;
            let attr = read_attr(&mut r)?;
            op.attrs.insert(name, attr);
        }
        ops.push(op);
    }
    r.finish()?;
    Ok(Program::new(vars, ops).validate()?)
}

// ── Parameter stream ───────────────────────────────────────────────

fn write_record(w: &mut Writer, name: &str, tensor: &Tensor) {
    w.string(name);
    let dims = tensor.shape().dims();
    w.len(dims.len());
    for &d in dims {
        w.len(d);
    }
    w.lod(tensor.lod());
    w.u8(tensor.dtype().tag());
    let data = tensor.as_bytes();
    w.len(data.len());
    w.bytes(data);
}

fn read_record(r: &mut Reader<'_>) -> Result<(String, Tensor), ModelIoError> {
    let name = r.string()?;
    let rank = r.len(8)?;
    let dims = r
        .u64s(rank)?
        .into_iter()
        .map(|d| usize::try_from(d).map_err(|_| r.corrupt(format!("dimension {d} of '{name}' overflows"))))
        .collect::<Result<Vec<_>, _>>()?;
    let levels = r.len(8)?;
    let mut lod = Vec::with_capacity(levels);
    for _ in 0..levels {
        let n = r.len(8)?;
        lod.push(r.u64s(n)?);
    }
    let dtype = r.dtype()?;
    let byte_len = r.len(1)?;
    let shape = Shape::new(dims);
    let expected = shape
        .checked_size_bytes(dtype)
        .ok_or_else(|| r.corrupt(format!("'{name}' size of {shape} x {dtype} overflows")))?;
    if byte_len != expected {
        return Err(r.corrupt(format!(
            "'{name}' declares {byte_len} bytes but {shape} of {dtype} needs {expected}"
        )));
    }
    let mut tensor = Tensor::from_bytes(shape, dtype, r.take(byte_len)?)?;
    tensor
        .set_lod(Lod::new(lod))
        .map_err(|e| r.corrupt(format!("'{name}': {e}")))?;
    Ok((name, tensor))
}

fn encode_records<'t>(records: impl ExactSizeIterator<Item = (&'t str, &'t Tensor)>) -> Vec<u8> {
    let mut w = Writer::new();
    w.magic(PARAM_MAGIC, VERSION);
    w.len(records.len());
    for (name, tensor) in records {
        write_record(&mut w, name, tensor);
    }
    w.into_inner()
}

fn decode_records(stream: &str, bytes: &[u8]) -> Result<Vec<(String, Tensor)>, ModelIoError> {
    let mut r = Reader::new(stream, bytes);
    r.magic(PARAM_MAGIC, VERSION)?;
    let n = r.len(33)?;
    let records = (0..n).map(|_| read_record(&mut r)).collect::<Result<Vec<_>, _>>()?;
    r.finish()?;
    Ok(records)
}

/// Encodes a program and its persistable tensors.
pub fn encode<S: ProgramState>(program: &Program<S>, scope: &Scope) -> Result<NaiveBuffers, ModelIoError> {
    let params = persistable_tensors(program, scope)?;
    Ok(NaiveBuffers {
        model: encode_program(program),
        params: encode_records(params.iter().map(|(n, t)| (n.as_str(), *t))),
    })
}

// ── Files ──────────────────────────────────────────────────────────

/// Loads a naive buffer model from files or memory.
pub fn load_naive(source: &NaiveSource) -> Result<(Program<Validated>, Scope), ModelIoError> {
    let (model, params) = source.open()?;
    let program = decode_program(model.name(), model.bytes())?;
    let records = decode_records(params.name(), params.bytes())?;
    let scope = bind_params(&program, records, params.name())?;
    tracing::info!(
        model = model.name(),
        ops = program.num_ops(),
        params = scope.len(),
        "loaded naive buffer model"
    );
    Ok((program, scope))
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), ModelIoError> {
    fs::write(path, bytes).map_err(ModelIoError::io(path))
}

/// Saves `program` and the persistable tensors of `scope` as
/// `dir/__model__.nb` and `dir/param.nb`.
pub fn save_naive<S: ProgramState>(dir: impl AsRef<Path>, program: &Program<S>, scope: &Scope) -> Result<(), ModelIoError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(ModelIoError::io(dir))?;
    let buffers = encode(program, scope)?;
    write(&dir.join(MODEL_FILE), &buffers.model)?;
    write(&dir.join(PARAM_FILE), &buffers.params)?;
    tracing::info!(
        dir = %dir.display(),
        model_bytes = buffers.model.len(),
        param_bytes = buffers.params.len(),
        "saved naive buffer model"
    );
    Ok(())
}

/// Writes the tensor `name` of `scope` as a one-record parameter stream.
pub fn save_param_naive(path: impl AsRef<Path>, scope: &Scope, name: &str) -> Result<(), ModelIoError> {
    let tensor = scope.find_tensor(name)?;
    write(path.as_ref(), &encode_records(std::iter::once((name, tensor))))
}

/// Reads a one-record parameter stream into `scope` as `name`.
pub fn load_param_naive(path: impl AsRef<Path>, scope: &mut Scope, name: &str) -> Result<(), ModelIoError> {
    let file = MmapSource::open(path)?;
    let mut records = decode_records(file.name(), file.bytes())?;
    let (stored, tensor) = match records.len() {
        1 => records.remove(0),
        n => {
            return Err(ModelIoError::corrupt(
                file.name(),
                format!("expected one parameter record, found {n}"),
            ))
        }
    };
    if stored != name {
        tracing::warn!(stored = %stored, name, "loading parameter under a different name");
    }
    scope.insert(name, tensor);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::DType;

    fn program() -> Program<Validated> {
        let vars = vec![
            VarDesc::new("x", DType::F32),
            VarDesc::persistable("w", DType::F16),
            VarDesc::new("y", DType::F32),
        ];
        let op = OpDesc::new("conv")
            .with_input("Input", ["x"])
            .with_input("Filter", ["w"])
            .with_output("Out", ["y"])
            .with_attr("i", Attribute::Int(-2))
            .with_attr("f", Attribute::Float(0.25))
            .with_attr("s", Attribute::String("nchw".into()))
            .with_attr("is", Attribute::Ints(vec![1, 2]))
            .with_attr("fs", Attribute::Floats(vec![0.5]))
            .with_attr("ss", Attribute::Strings(vec!["a".into(), "".into()]))
            .with_attr("b", Attribute::Bool(true))
            .with_attr("l", Attribute::Long(i64::MIN))
            .with_attr("ls", Attribute::Longs(vec![3, 100]))
            .with_place(Place::new(Target::Fpga, Precision::Fp16));
        let plain = OpDesc::new("relu").with_input("X", ["y"]).with_output("Out", ["y2"]);
        Program::new(vars, vec![op, plain]).validate().unwrap()
    }

    #[test]
    fn test_program_stream_round_trip() {
        let bytes = encode_program(&program());
        assert_eq!(&bytes[..4], b"LTNB");
        let back = decode_program("m", &bytes).unwrap();
        assert_eq!(back, program());
        assert_eq!(back.ops()[1].place, None);
    }

    #[test]
    fn test_program_stream_rejects_damage() {
        let bytes = encode_program(&program());
        for cut in [3, 6, 20, bytes.len() - 1] {
            assert!(decode_program("m", &bytes[..cut]).unwrap_err().is_corrupt(), "cut {cut}");
        }
        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(decode_program("m", &trailing).is_err());
        let mut magic = bytes;
        magic[0] = b'X';
        assert!(decode_program("m", &magic).is_err());
    }

    #[test]
    fn test_unknown_attr_tag() {
        let mut w = Writer::new();
        w.u8(42);
        let buf = w.into_inner();
        assert!(read_attr(&mut Reader::new("m", &buf)).is_err());
    }

    #[test]
    fn test_params_checked_against_program() {
        let p = program();
        let w = Tensor::zeros(Shape::vector(2), DType::F16);
        let bytes = encode_records(std::iter::once(("w", &w)));
        let records = decode_records("p", &bytes).unwrap();
        assert_eq!(bind_params(&p, records, "p").unwrap().len(), 1);

        let wrong = encode_records(std::iter::once(("x", &w)));
        let err = bind_params(&p, decode_records("p", &wrong).unwrap(), "p").unwrap_err();
        assert!(err.is_corrupt());

        let empty = encode_records(std::iter::empty());
        assert!(bind_params(&p, decode_records("p", &empty).unwrap(), "p").is_err());
    }

    #[test]
    fn test_byte_length_mismatch() {
        let mut w = Writer::new();
        w.magic(PARAM_MAGIC, VERSION);
        w.len(1);
        w.string("w");
        w.len(1);
        w.len(4);
        w.len(0);
        w.u8(DType::F32.tag());
        w.len(12);
        w.bytes(&[0; 12]);
        let err = decode_records("p", &w.into_inner()).unwrap_err();
        assert!(err.to_string().contains("declares 12 bytes"), "{err}");
    }

    #[test]
    fn test_overflowing_dims_are_corrupt() {
        let mut w = Writer::new();
        w.magic(PARAM_MAGIC, VERSION);
        w.len(1);
        w.string("w");
        w.len(2);
        w.len(1 << 62);
        w.len(4);
        w.len(0);
        w.u8(DType::F32.tag());
        w.len(0);
        let err = decode_records("p", &w.into_inner()).unwrap_err();
        assert!(err.is_corrupt(), "{err}");
        assert!(err.to_string().contains("overflows"), "{err}");
    }
}
