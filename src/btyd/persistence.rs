//! persistence — JSON model state for fitted results.
//!
//! Purpose
//! -------
//! Save a [`FitResult`] to disk (or a string) and restore it so that every
//! prediction made from the restored result is bit-identical to the
//! original.
//!
//! Key behaviors
//! -------------
//! - [`ModelState`] is the persisted bundle: model tag and options, named
//!   parameters, scale factor, penalizer, objective, optimizer report,
//!   diagnostics and (optionally) the training data.
//! - [`save_model`] / [`load_model`] write and read pretty-printed JSON;
//!   [`to_json`] / [`from_json`] do the same in memory.
//! - [`read_kind`] reports the stored model tag so callers can pick the
//!   model type before loading.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters are stored in the caller's time units, so restoring never
//!   re-applies the scale factor.
//! - Floats round-trip exactly (`serde_json` with `float_roundtrip`).
//! - Loading into a different model type fails with
//!   [`BtydError::ModelKindMismatch`]; an empty parameter vector fails with
//!   [`BtydError::NotFitted`].
use crate::{
    btyd::{
        core::{
            fit_result::FitResult,
            params::{ModelParams, ParamVector},
        },
        errors::{BtydError, BtydResult},
        models::traits::{BtydModel, ModelKind},
    },
    inference::Diagnostics,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Persisted form of a [`FitResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState<M, D> {
    pub kind: ModelKind,
    pub model: M,
    pub params: ParamVector,
    pub scale: f64,
    pub penalizer: f64,
    pub objective: f64,
    pub n_subjects: usize,
    pub converged: bool,
    pub iterations: usize,
    pub status: String,
    pub solver: String,
    pub diagnostics: Option<Diagnostics>,
    pub data: Option<D>,
}

impl<M: BtydModel> ModelState<M, M::Data> {
    /// Snapshot a fit; `include_data = false` leaves the data out.
    pub fn from_result(result: &FitResult<M>, include_data: bool) -> Self {
        Self {
            kind: result.model.kind(),
            model: result.model.clone(),
            params: result.vector.clone(),
            scale: result.scale,
            penalizer: result.penalizer,
            objective: result.objective,
            n_subjects: result.n_subjects,
            converged: result.converged,
            iterations: result.iterations,
            status: result.status.clone(),
            solver: result.solver.clone(),
            diagnostics: result.diagnostics.clone(),
            data: if include_data { result.data.clone() } else { None },
        }
    }

    /// Rebuild the fit result.
    ///
    /// # Errors
    /// - `BtydError::ModelKindMismatch` if the stored tag does not match the
    ///   stored model.
    /// - `BtydError::NotFitted` / `MissingParam` / `InvalidParams` when the
    ///   parameter vector cannot produce the model's parameters.
    pub fn into_result(self) -> BtydResult<FitResult<M>> {
        let expected = self.model.kind();
        if self.kind != expected {
            return Err(BtydError::ModelKindMismatch { expected, found: self.kind });
        }
        let params = M::Params::from_vector(&self.params)?;
        Ok(FitResult {
            model: self.model,
            params,
            vector: self.params,
            objective: self.objective,
            scale: self.scale,
            penalizer: self.penalizer,
            n_subjects: self.n_subjects,
            converged: self.converged,
            iterations: self.iterations,
            status: self.status,
            solver: self.solver,
            diagnostics: self.diagnostics,
            data: self.data,
        })
    }
}

/// Serialize a fit to a JSON string.
///
/// # Errors
/// - `BtydError::Persistence` if serialization fails.
pub fn to_json<M: BtydModel>(result: &FitResult<M>, include_data: bool) -> BtydResult<String> {
    Ok(serde_json::to_string_pretty(&ModelState::from_result(result, include_data))?)
}

/// Restore a fit from a JSON string.
///
/// # Errors
/// - `BtydError::Persistence` for malformed JSON or a state of another
///   model type.
/// - Errors of [`ModelState::into_result`].
pub fn from_json<M: BtydModel>(json: &str) -> BtydResult<FitResult<M>> {
    let found = kind_of(json)?;
    if found != M::KIND {
        return Err(BtydError::ModelKindMismatch { expected: M::KIND, found });
    }
    let state: ModelState<M, M::Data> = serde_json::from_str(json)?;
    state.into_result()
}

/// Write a fit to `path` as JSON.
///
/// # Errors
/// - `BtydError::Persistence` for serialization or I/O failures.
pub fn save_model<M: BtydModel, P: AsRef<Path>>(
    result: &FitResult<M>, path: P, include_data: bool,
) -> BtydResult<()> {
    let json = to_json(result, include_data)?;
    fs::write(path, json)?;
    Ok(())
}

/// Read a fit written by [`save_model`].
///
/// # Errors
/// - `BtydError::Persistence` for I/O failures or malformed content.
/// - `BtydError::ModelKindMismatch` when the file holds another model.
pub fn load_model<M: BtydModel, P: AsRef<Path>>(path: P) -> BtydResult<FitResult<M>> {
    let json = fs::read_to_string(path)?;
    from_json(&json)
}

/// Model tag stored in the file at `path`.
///
/// # Errors
/// - `BtydError::Persistence` for I/O failures or a missing tag.
pub fn read_kind<P: AsRef<Path>>(path: P) -> BtydResult<ModelKind> {
    kind_of(&fs::read_to_string(path)?)
}

// ---- Helper methods ----

#[derive(Deserialize)]
struct KindOnly {
    kind: ModelKind,
}

fn kind_of(json: &str) -> BtydResult<ModelKind> {
    let tagged: KindOnly = serde_json::from_str(json)?;
    Ok(tagged.kind)
}
