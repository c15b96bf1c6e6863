//! Mock collaborators for assembly tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;
use ndarray::Array3;

use opm_core::{truncate, Affine, Mat4, SampleMetadata, ViewKey};
use opm_pipeline::{
    AttributeCounts, RegisteredVolume, StackSource, ViewPayload, VolumeLayout, VolumeWriter,
    VolumeWriterFactory,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn touch(dir: &Path, name: &str) {
    File::create(dir.join(name)).unwrap();
}

pub fn identity() -> Affine {
    truncate(&Mat4::identity())
}

/// `(z, y, x)` shape of every synthetic stack.
pub const STACK_SHAPE: (usize, usize, usize) = (4, 3, 2);
pub const Z_STEP_UM: f64 = 0.5;

/// Deterministic reader: voxel values are a function of the file name, the
/// channel, and the voxel position, so repeated reads are bit-identical.
pub struct SyntheticSource {
    pub channel_names: Vec<String>,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self { channel_names: vec!["DAPI".into(), "GFP".into()] }
    }
}

impl StackSource for SyntheticSource {
    fn sample_metadata(&mut self, _path: &Path) -> Result<SampleMetadata> {
        Ok(SampleMetadata {
            width_px: STACK_SHAPE.2,
            height_px: STACK_SHAPE.1,
            sequence_count: STACK_SHAPE.0,
            z_step_um: Z_STEP_UM,
            channel_names: self.channel_names.clone(),
        })
    }

    fn channel_stack(&mut self, path: &Path, channel: usize) -> Result<Array3<u16>> {
        let seed = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .bytes()
            .fold(0u16, |acc, b| acc.wrapping_add(u16::from(b)));
        Ok(Array3::from_shape_fn(STACK_SHAPE, |(z, y, x)| {
            seed.wrapping_add((channel * 1000 + z * 100 + y * 10 + x) as u16)
        }))
    }
}

/// One appended view as the writer saw it.
#[derive(Debug, Clone)]
pub struct RecordedView {
    pub key: ViewKey,
    pub affine: Affine,
    pub stack: Array3<u16>,
    pub voxel_size: [f64; 3],
    pub calibration: [f64; 3],
}

/// Everything written to one container.
#[derive(Debug, Default)]
pub struct ContainerLog {
    pub layout: Option<VolumeLayout>,
    pub labels: HashMap<String, Vec<String>>,
    pub views: Vec<RecordedView>,
    pub header_written: bool,
    pub closed: bool,
}

impl ContainerLog {
    pub fn view(&self, key: ViewKey) -> Option<&RecordedView> {
        self.views.iter().find(|v| v.key == key)
    }
}

pub struct RecordingWriter {
    log: Rc<RefCell<ContainerLog>>,
}

impl VolumeWriter for RecordingWriter {
    fn set_attribute_labels(&mut self, attribute: &str, labels: &[String]) -> Result<()> {
        self.log.borrow_mut().labels.insert(attribute.to_owned(), labels.to_vec());
        Ok(())
    }

    fn append_view(&mut self, view: &ViewPayload<'_>) -> Result<()> {
        self.log.borrow_mut().views.push(RecordedView {
            key: view.key,
            affine: view.affine,
            stack: view.stack.clone(),
            voxel_size: view.voxel_size,
            calibration: view.calibration,
        });
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        self.log.borrow_mut().header_written = true;
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.log.borrow_mut().closed = true;
        Ok(())
    }
}

/// Hands out [`RecordingWriter`]s and keeps every container log addressable
/// by output path after the assembler is done with it.
#[derive(Default)]
pub struct RecordingFactory {
    pub containers: Rc<RefCell<HashMap<PathBuf, Rc<RefCell<ContainerLog>>>>>,
}

impl VolumeWriterFactory for RecordingFactory {
    type Writer = RecordingWriter;

    fn create(&self, path: &Path, layout: &VolumeLayout) -> Result<RecordingWriter> {
        let log = Rc::new(RefCell::new(ContainerLog {
            layout: Some(layout.clone()),
            ..ContainerLog::default()
        }));
        self.containers.borrow_mut().insert(path.to_path_buf(), log.clone());
        Ok(RecordingWriter { log })
    }
}

/// Registered container whose every chain composes to the identity.
pub struct IdentityRegisteredVolume {
    pub counts: AttributeCounts,
}

impl RegisteredVolume for IdentityRegisteredVolume {
    fn attribute_counts(&mut self) -> Result<AttributeCounts> {
        Ok(self.counts)
    }

    fn affine_chain(
        &mut self,
        _time: usize,
        _illumination: usize,
        _channel: usize,
        _tile: usize,
        _angle: usize,
    ) -> Result<Vec<Affine>> {
        // One usable identity step plus the trailing calibration step.
        Ok(vec![identity(), identity()])
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}
