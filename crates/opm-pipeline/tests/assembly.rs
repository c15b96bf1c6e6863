mod common;

use common::{
    identity, init_logging, touch, IdentityRegisteredVolume, RecordingFactory, SyntheticSource,
    STACK_SHAPE, Z_STEP_UM,
};

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use approx::assert_relative_eq;
use tempfile::TempDir;

use opm_core::{ViewKey, WellId};
use opm_pipeline::{AttributeCounts, DataConfig, DatasetAssembler, HardcodedVars};

type Containers = Rc<RefCell<HashMap<PathBuf, Rc<RefCell<common::ContainerLog>>>>>;

const PIX_X: f64 = 0.147;

fn data_config(input: &Path, output: &Path, fix_corrupt_even_planes: bool) -> DataConfig {
    DataConfig {
        scan_type: "remote_scanning".to_owned(),
        input_path: input.to_path_buf(),
        output_path: output.to_path_buf(),
        hardcoded_vars: HardcodedVars {
            pix_x: PIX_X,
            mirror_tilt: 30.0,
            fix_corrupt_even_planes,
        },
    }
}

fn assembler(
    config: &DataConfig,
) -> (DatasetAssembler<SyntheticSource, RecordingFactory>, Containers) {
    let factory = RecordingFactory::default();
    let containers = factory.containers.clone();
    let assembler = DatasetAssembler::from_config(config, SyntheticSource::default(), factory)
        .expect("known scan type");
    (assembler, containers)
}

/// Full grid for well B2: times {0, 1}, tile {0}, angles {0, 1}.
fn populate_full_grid(dir: &Path) {
    for time in ["0000", "0001"] {
        for angle in ["0", "1"] {
            touch(dir, &format!("beads_Time{time}_Tile0000_angle{angle}__WellB2_full.nd2"));
        }
    }
}

fn well_b2() -> WellId {
    WellId::new("B2").unwrap()
}

#[test]
fn unregistered_assembly_appends_the_full_grid() {
    init_logging();
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    populate_full_grid(input.path());

    let config = data_config(input.path(), output.path(), false);
    let (mut assembler, containers) = assembler(&config);
    let written = assembler.assemble_well(&well_b2()).unwrap();
    assert_eq!(written, output.path().join("dataset_WellB2.xml"));

    let containers = containers.borrow();
    let log = containers.get(&written).unwrap().borrow();

    let layout = log.layout.as_ref().unwrap();
    assert_eq!(layout.block_size, [64, 64, 64]);
    assert_eq!((layout.channels, layout.angles, layout.tiles, layout.illuminations), (2, 2, 1, 1));
    assert_eq!(log.labels["angle"], vec!["0", "1"]);
    assert_eq!(log.labels["channel"], vec!["DAPI", "GFP"]);

    // 2 times x 1 tile x 2 angles x 2 channels.
    assert_eq!(log.views.len(), 8);
    assert!(log.header_written);
    assert!(log.closed);

    for view in &log.views {
        assert_eq!(view.stack.dim(), STACK_SHAPE);
        assert_eq!(view.voxel_size, [PIX_X, PIX_X, Z_STEP_UM]);
        assert_relative_eq!(view.calibration[2], Z_STEP_UM / PIX_X, epsilon = 1e-12);
    }

    // One deskew transform per angle, shared by every view with that angle.
    let affine_at = |angle| {
        log.views.iter().find(|v| v.key.angle == angle).unwrap().affine
    };
    for view in &log.views {
        assert_eq!(view.affine, affine_at(view.key.angle));
    }
    assert_ne!(affine_at(0), affine_at(1));
}

#[test]
fn missing_view_is_skipped_and_the_rest_survive() {
    init_logging();
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    populate_full_grid(input.path());
    std::fs::remove_file(
        input.path().join("beads_Time0001_Tile0000_angle1__WellB2_full.nd2"),
    )
    .unwrap();

    let config = data_config(input.path(), output.path(), false);
    let (mut assembler, containers) = assembler(&config);
    let written = assembler.assemble_well(&well_b2()).unwrap();

    let containers = containers.borrow();
    let log = containers.get(&written).unwrap().borrow();

    assert_eq!(log.views.len(), 6);
    assert!(log
        .views
        .iter()
        .all(|v| !(v.key.time == 1 && v.key.angle == 1)));
    // The sibling angle at the same timepoint is still present.
    for channel in 0..2 {
        assert!(log.view(ViewKey { time: 1, tile: 0, angle: 0, channel }).is_some());
    }
    assert!(log.header_written);
    assert!(log.closed);
}

#[test]
fn registered_identity_pass_reproduces_unregistered_content() {
    init_logging();
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    populate_full_grid(input.path());

    let config = data_config(input.path(), output.path(), false);
    let (mut assembler, containers) = assembler(&config);

    let plain = assembler.assemble_well(&well_b2()).unwrap();
    let registered = assembler
        .assemble_well_registered(
            &well_b2(),
            IdentityRegisteredVolume {
                counts: AttributeCounts {
                    times: 2,
                    illuminations: 1,
                    channels: 2,
                    tiles: 1,
                    angles: 2,
                },
            },
        )
        .unwrap();
    assert_eq!(registered, output.path().join("dataset_WellB2_registered.xml"));

    let containers = containers.borrow();
    let plain_log = containers.get(&plain).unwrap().borrow();
    let registered_log = containers.get(&registered).unwrap().borrow();

    assert_eq!(plain_log.views.len(), registered_log.views.len());
    for view in &registered_log.views {
        // Identity transforms replace the deskew, but the voxel content and
        // calibration of every appended view are unchanged.
        assert_eq!(view.affine, identity());
        let twin = plain_log.view(view.key).unwrap();
        assert_eq!(view.stack, twin.stack);
        assert_eq!(view.calibration, twin.calibration);
        assert_eq!(view.voxel_size, twin.voxel_size);
    }
}

#[test]
fn registered_pass_fails_on_a_missing_transform_key() {
    init_logging();
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    populate_full_grid(input.path());

    let config = data_config(input.path(), output.path(), false);
    let (mut assembler, _) = assembler(&config);

    // The registered container only knows one channel; the acquisition has
    // two, so the second channel has no transform to look up.
    let err = assembler
        .assemble_well_registered(
            &well_b2(),
            IdentityRegisteredVolume {
                counts: AttributeCounts {
                    times: 2,
                    illuminations: 1,
                    channels: 1,
                    tiles: 1,
                    angles: 2,
                },
            },
        )
        .unwrap_err();
    assert!(err.to_string().contains("no registered transform"));
}

#[test]
fn corrupt_plane_fix_patches_appended_stacks() {
    init_logging();
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    populate_full_grid(input.path());

    let patched_config = data_config(input.path(), output.path(), true);
    let (mut assembler, containers) = assembler(&patched_config);
    let written = assembler.assemble_well(&well_b2()).unwrap();

    let containers = containers.borrow();
    let log = containers.get(&written).unwrap().borrow();
    for view in &log.views {
        let stack = &view.stack;
        for z in (1..STACK_SHAPE.0).step_by(2) {
            assert_eq!(
                stack.index_axis(ndarray::Axis(0), z),
                stack.index_axis(ndarray::Axis(0), z - 1)
            );
        }
        // Even planes keep distinct content.
        assert_ne!(
            stack.index_axis(ndarray::Axis(0), 0),
            stack.index_axis(ndarray::Axis(0), 2)
        );
    }
}

#[test]
fn more_than_two_angles_cannot_be_deskewed() {
    init_logging();
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    populate_full_grid(input.path());
    touch(input.path(), "beads_Time0000_Tile0000_angle2__WellB2_full.nd2");

    let config = data_config(input.path(), output.path(), false);
    let (mut assembler, _) = assembler(&config);
    let err = assembler.assemble_well(&well_b2()).unwrap_err();
    assert!(err.to_string().contains("angles"));
}

#[test]
fn unknown_scan_type_fails_before_any_io() {
    let config = DataConfig {
        scan_type: "spiral_scanning".to_owned(),
        input_path: PathBuf::from("/nonexistent/input"),
        output_path: PathBuf::from("/nonexistent/output"),
        hardcoded_vars: HardcodedVars {
            pix_x: PIX_X,
            mirror_tilt: 30.0,
            fix_corrupt_even_planes: false,
        },
    };
    // The input directory does not exist; construction must fail on the scan
    // type alone.
    let err =
        DatasetAssembler::from_config(&config, SyntheticSource::default(), RecordingFactory::default())
            .err()
            .unwrap();
    assert!(err.to_string().contains("spiral_scanning"));
}
