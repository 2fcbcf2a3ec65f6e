// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The structured model format.
//!
//! A model directory holds a JSON program description and binary
//! parameter records:
//!
//! ```text
//! non-combined                 combined
//! ────────────                 ────────
//! dir/__model__   (JSON)       dir/model    (JSON)
//! dir/<var name>  (1 record)   dir/params   (all records, by name)
//! ```
//!
//! A parameter record is little-endian:
//!
//! ```text
//! u32 lod version (0)
//! u64 levels, then per level: u64 byte length, u64 offsets
//! u32 tensor version (0)
//! u32 descriptor length, descriptor JSON {"dtype", "dims"}
//! raw element bytes
//! ```

use crate::byte_source::{ByteSource, MmapSource};
use crate::codec::Reader;
use crate::params::{bind_params, persistable_tensors};
use crate::ModelIoError;
use model_ir::{OpDesc, Program, ProgramState, Scope, Validated, VarDesc};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tensor_core::{DType, Lod, Shape, Tensor};

/// Program file name in a non-combined directory.
pub const MODEL_FILE: &str = "__model__";
/// Program file name in a combined directory.
pub const COMBINED_MODEL_FILE: &str = "model";
/// Parameter file name in a combined directory.
pub const COMBINED_PARAM_FILE: &str = "params";

const FORMAT_TAG: &str = "lite-program";
const FORMAT_VERSION: u32 = 1;
const LOD_VERSION: u32 = 0;
const TENSOR_VERSION: u32 = 0;

/// Where a structured model lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredSource {
    pub dir: PathBuf,
    /// Parameters are stored in a single file.
    pub combined: bool,
    /// Overrides the combined program file path.
    pub model_file: Option<PathBuf>,
    /// Overrides the combined parameter file path.
    pub param_file: Option<PathBuf>,
}

impl StructuredSource {
    /// A non-combined model directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            combined: false,
            model_file: None,
            param_file: None,
        }
    }

    /// A combined model directory with the default file names.
    pub fn combined(dir: impl Into<PathBuf>) -> Self {
        Self {
            combined: true,
            ..Self::new(dir)
        }
    }

    /// A combined model at explicit paths.
    pub fn with_files(model_file: impl Into<PathBuf>, param_file: impl Into<PathBuf>) -> Self {
        let model_file = model_file.into();
        let dir = model_file.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            dir,
            combined: true,
            model_file: Some(model_file),
            param_file: Some(param_file.into()),
        }
    }

    /// Path of the program file.
    pub fn model_path(&self) -> PathBuf {
        match (&self.model_file, self.combined) {
            (Some(path), true) => path.clone(),
            (_, true) => self.dir.join(COMBINED_MODEL_FILE),
            (_, false) => self.dir.join(MODEL_FILE),
        }
    }

    /// Path of the combined parameter file.
    pub fn param_path(&self) -> PathBuf {
        self.param_file
            .clone()
            .unwrap_or_else(|| self.dir.join(COMBINED_PARAM_FILE))
    }
}

// ── Program document ───────────────────────────────────────────────

#[derive(serde::Serialize, serde::Deserialize)]
struct ProgramDoc {
    format: String,
    version: u32,
    vars: Vec<VarDesc>,
    ops: Vec<OpDesc>,
}

/// Serializes `program` as pretty-printed JSON.
pub fn program_to_json<S: ProgramState>(program: &Program<S>) -> Result<Vec<u8>, ModelIoError> {
    let doc = ProgramDoc {
        format: FORMAT_TAG.to_string(),
        version: FORMAT_VERSION,
        vars: program.vars().to_vec(),
        ops: program.ops().to_vec(),
    };
    let mut out = serde_json::to_vec_pretty(&doc)
        .map_err(|e| ModelIoError::corrupt(MODEL_FILE, format!("cannot encode program: {e}")))?;
    out.push(b'\n');
    Ok(out)
}

/// Parses and validates a program document.
pub fn program_from_json(bytes: &[u8], stream: &str) -> Result<Program<Validated>, ModelIoError> {
    let doc: ProgramDoc = serde_json::from_slice(bytes)
        .map_err(|e| ModelIoError::corrupt(stream, format!("malformed program: {e}")))?;
    if doc.format != FORMAT_TAG {
        return Err(ModelIoError::corrupt(
            stream,
            format!("format tag '{}', expected '{FORMAT_TAG}'", doc.format),
        ));
    }
    if doc.version != FORMAT_VERSION {
        return Err(ModelIoError::corrupt(
            stream,
            format!("unsupported version {}, expected {FORMAT_VERSION}", doc.version),
        ));
    }
    Ok(Program::new(doc.vars, doc.ops).validate()?)
}

// ── Tensor records ─────────────────────────────────────────────────

#[derive(serde::Serialize, serde::Deserialize)]
struct TensorDesc {
    dtype: DType,
    dims: Vec<usize>,
}

/// Appends one parameter record for `tensor` to `out`.
pub fn write_tensor_record(tensor: &Tensor, out: &mut Vec<u8>) -> Result<(), ModelIoError> {
    out.extend_from_slice(&LOD_VERSION.to_le_bytes());
    let lod = tensor.lod();
    out.extend_from_slice(&(lod.num_levels() as u64).to_le_bytes());
    for level in lod.levels() {
        out.extend_from_slice(&((level.len() * 8) as u64).to_le_bytes());
        for &offset in level {
            out.extend_from_slice(&offset.to_le_bytes());
        }
    }

    out.extend_from_slice(&TENSOR_VERSION.to_le_bytes());
    let desc = TensorDesc {
        dtype: tensor.dtype(),
        dims: tensor.shape().dims().to_vec(),
    };
    let desc = serde_json::to_vec(&desc)
        .map_err(|e| ModelIoError::corrupt("tensor record", format!("cannot encode descriptor: {e}")))?;
    out.extend_from_slice(&(desc.len() as u32).to_le_bytes());
    out.extend_from_slice(&desc);
    out.extend_from_slice(tensor.as_bytes());
    Ok(())
}

pub(crate) fn read_tensor_record(r: &mut Reader<'_>) -> Result<Tensor, ModelIoError> {
    let version = r.u32()?;
    if version != LOD_VERSION {
        return Err(r.corrupt(format!("lod version {version}, expected {LOD_VERSION}")));
    }
    let levels = r.len(8)?;
    let mut lod = Vec::with_capacity(levels);
    for _ in 0..levels {
        let byte_len = r.len(1)?;
        if byte_len % 8 != 0 {
            return Err(r.corrupt(format!("lod level byte length {byte_len} is not a multiple of 8")));
        }
        lod.push(r.u64s(byte_len / 8)?);
    }

    let version = r.u32()?;
    if version != TENSOR_VERSION {
        return Err(r.corrupt(format!("tensor version {version}, expected {TENSOR_VERSION}")));
    }
    let desc_len = r.u32()? as usize;
    let desc: TensorDesc = serde_json::from_slice(r.take(desc_len)?)
        .map_err(|e| r.corrupt(format!("malformed tensor descriptor: {e}")))?;
    let shape = Shape::new(desc.dims);
    let size = shape
        .checked_size_bytes(desc.dtype)
        .ok_or_else(|| r.corrupt(format!("size of {shape} x {} overflows", desc.dtype)))?;
    let data = r.take(size)?;

    let mut tensor = Tensor::from_bytes(shape, desc.dtype, data)?;
    tensor
        .set_lod(Lod::new(lod))
        .map_err(|e| r.corrupt(e.to_string()))?;
    Ok(tensor)
}

/// Path of the single-record file holding `name` in a non-combined
/// directory. The name must be one plain path component that does not
/// collide with the program file.
fn param_file(dir: &Path, name: &str) -> Result<PathBuf, ModelIoError> {
    let invalid = |reason| ModelIoError::InvalidParamName {
        name: name.to_owned(),
        reason,
    };
    if name == MODEL_FILE {
        return Err(invalid("collides with the program file"));
    }
    if name.contains(['/', '\\']) {
        return Err(invalid("contains a path separator"));
    }
    let mut parts = Path::new(name).components();
    match (parts.next(), parts.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(dir.join(name)),
        _ => Err(invalid("is not a plain file name")),
    }
}

// ── Loading ────────────────────────────────────────────────────────

/// Loads a program and its parameters from a structured model.
pub fn load_structured(source: &StructuredSource) -> Result<(Program<Validated>, Scope), ModelIoError> {
    let model_path = source.model_path();
    let program = load_program(&model_path)?;

    let names: Vec<String> = program
        .persistable_vars()
        .into_iter()
        .map(|v| v.name.clone())
        .collect();

    let scope = if source.combined {
        let param_path = source.param_path();
        let file = MmapSource::open(&param_path)?;
        let mut r = Reader::new(file.name(), file.bytes());
        let mut records = Vec::with_capacity(names.len());
        for name in &names {
            if r.is_empty() {
                break;
            }
            records.push((name.clone(), read_tensor_record(&mut r)?));
        }
        if !r.is_empty() {
            return Err(r.corrupt(format!(
                "parameter data continues past the {} persistable variables",
                names.len()
            )));
        }
        bind_params(&program, records, r.stream())?
    } else {
        let records = names
            .iter()
            .map(|name| Ok((name.clone(), load_param(param_file(&source.dir, name)?)?)))
            .collect::<Result<Vec<_>, ModelIoError>>()?;
        bind_params(&program, records, &source.dir.display().to_string())?
    };

    tracing::info!(
        path = %model_path.display(),
        combined = source.combined,
        ops = program.num_ops(),
        params = scope.len(),
        "loaded structured model"
    );
    Ok((program, scope))
}

/// Loads and validates a single program file.
pub fn load_program(path: impl AsRef<Path>) -> Result<Program<Validated>, ModelIoError> {
    let file = MmapSource::open(path)?;
    program_from_json(file.bytes(), file.name())
}

/// Loads a single-record parameter file.
pub fn load_param(path: impl AsRef<Path>) -> Result<Tensor, ModelIoError> {
    let file = MmapSource::open(path)?;
    let mut r = Reader::new(file.name(), file.bytes());
    let tensor = read_tensor_record(&mut r)?;
    r.finish()?;
    Ok(tensor)
}

// ── Saving ─────────────────────────────────────────────────────────

fn write(path: &Path, bytes: &[u8]) -> Result<(), ModelIoError> {
    fs::write(path, bytes).map_err(ModelIoError::io(path))
}

/// Saves `program` and the persistable tensors of `scope` under `dir`.
///
/// Transient variables are never written.
pub fn save_structured<S: ProgramState>(
    dir: impl AsRef<Path>,
    program: &Program<S>,
    scope: &Scope,
    combined: bool,
) -> Result<(), ModelIoError> {
    let dir = dir.as_ref();
    let params = persistable_tensors(program, scope)?;
    let param_files = if combined {
        Vec::new()
    } else {
        params
            .iter()
            .map(|(name, _)| param_file(dir, name))
            .collect::<Result<Vec<_>, _>>()?
    };
    let json = program_to_json(program)?;
    fs::create_dir_all(dir).map_err(ModelIoError::io(dir))?;

    if combined {
        write(&dir.join(COMBINED_MODEL_FILE), &json)?;
        let mut buf = Vec::new();
        for (_, tensor) in &params {
            write_tensor_record(tensor, &mut buf)?;
        }
        write(&dir.join(COMBINED_PARAM_FILE), &buf)?;
    } else {
        write(&dir.join(MODEL_FILE), &json)?;
        for ((_, tensor), path) in params.iter().zip(&param_files) {
            let mut buf = Vec::new();
            write_tensor_record(tensor, &mut buf)?;
            write(path, &buf)?;
        }
    }

    tracing::info!(
        dir = %dir.display(),
        combined,
        params = params.len(),
        "saved structured model"
    );
    Ok(())
}
