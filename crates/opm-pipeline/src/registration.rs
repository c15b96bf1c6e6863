//! Recovery of net per-view transforms from a registered container.
//!
//! An external alignment pass records an ordered chain of affine steps per
//! view; the last entry is the calibration-only step. The net transform is
//! the homogeneous product of the remaining steps, taken left-to-right.

use std::collections::BTreeMap;

use anyhow::Result;
use log::debug;
use thiserror::Error;

use opm_core::{promote, truncate, Affine, Mat4};

use crate::io::RegisteredVolume;

/// How recovered transforms are keyed.
///
/// Whether a dataset carries one transform per tile is an explicit property
/// of the container, fixed once here rather than re-derived at each lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScheme {
    /// One transform per `(channel, angle)`, shared by all tiles.
    ChannelAngle,
    /// One transform per `(channel, angle, tile)`.
    ChannelAngleTile,
}

impl KeyScheme {
    /// Default inference: multi-tile containers key per tile.
    pub fn infer(ntiles: usize) -> Self {
        if ntiles > 1 {
            Self::ChannelAngleTile
        } else {
            Self::ChannelAngle
        }
    }

    fn key(self, channel: usize, angle: usize, tile: usize) -> RegistrationKey {
        match self {
            Self::ChannelAngle => RegistrationKey { channel, angle, tile: None },
            Self::ChannelAngleTile => RegistrationKey { channel, angle, tile: Some(tile) },
        }
    }
}

/// Key of one recovered transform under a [`KeyScheme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegistrationKey {
    pub channel: usize,
    pub angle: usize,
    pub tile: Option<usize>,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A view's affine chain has no steps at all; the container is not a
    /// valid registration result.
    #[error("affine chain for channel {channel}, tile {tile}, angle {angle} has no steps")]
    EmptyChain { channel: usize, tile: usize, angle: usize },
}

/// Net transforms recovered from one registered container.
#[derive(Debug, Clone)]
pub struct RegisteredTransforms {
    scheme: KeyScheme,
    transforms: BTreeMap<RegistrationKey, Affine>,
}

impl RegisteredTransforms {
    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Transform for a view, keyed according to the scheme.
    pub fn lookup(&self, channel: usize, angle: usize, tile: usize) -> Option<&Affine> {
        self.transforms.get(&self.scheme.key(channel, angle, tile))
    }
}

/// Read and compose the net transform for every view key of a registered
/// container, then release it.
///
/// Chains are read at timepoint 0, illumination 0. With
/// [`KeyScheme::ChannelAngle`] only tile 0 is consulted. Pass `None` to infer
/// the scheme from the container's tile count.
///
/// # Errors
///
/// [`RegistrationError::EmptyChain`] for a chain with zero steps; container
/// read errors propagate unmodified.
pub fn read_registered_transforms<V: RegisteredVolume>(
    mut volume: V,
    scheme: Option<KeyScheme>,
) -> Result<RegisteredTransforms> {
    let counts = volume.attribute_counts()?;
    let scheme = scheme.unwrap_or_else(|| KeyScheme::infer(counts.tiles));
    let tiles = match scheme {
        KeyScheme::ChannelAngle => 1,
        KeyScheme::ChannelAngleTile => counts.tiles,
    };

    let mut transforms = BTreeMap::new();
    for tile in 0..tiles {
        for channel in 0..counts.channels {
            for angle in 0..counts.angles {
                let chain = volume.affine_chain(0, 0, channel, tile, angle)?;
                let net = compose_chain(&chain)
                    .ok_or(RegistrationError::EmptyChain { channel, tile, angle })?;
                transforms.insert(scheme.key(channel, angle, tile), net);
            }
        }
    }
    volume.close()?;

    debug!("recovered {} registration transforms ({scheme:?})", transforms.len());
    Ok(RegisteredTransforms { scheme, transforms })
}

/// Drop the trailing calibration step and compose the rest left-to-right in
/// homogeneous form. A chain holding only the calibration step composes to
/// the identity; an empty chain is `None`.
fn compose_chain(chain: &[Affine]) -> Option<Affine> {
    let (_calibration, steps) = chain.split_last()?;
    let net = steps.iter().fold(Mat4::identity(), |acc, step| acc * promote(step));
    Some(truncate(&net))
}
