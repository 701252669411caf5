use ember3d::na::{point, vector};
use ember3d::prelude::*;

const ORDER: u32 = 5;
const EXTENT: u32 = 8;

fn pipeline_with(params: SpreadParameters, count: usize) -> SpreadPipeline {
    let mut pipeline = SpreadPipeline::new(params);
    pipeline
        .init(
            count,
            count,
            GridRegion::from_extents(vector![EXTENT, EXTENT, EXTENT]),
            AssignmentStencil::new(ORDER).unwrap(),
        )
        .unwrap();
    pipeline
}

fn run_pass(
    pipeline: &mut SpreadPipeline,
    positions: &[ParticlePosition],
    charges: &[Real],
) -> Result<(), SpreadError> {
    let kinds = vec![1; positions.len()];
    pipeline.compute(
        0,
        positions.len(),
        positions.len(),
        positions,
        &kinds,
        charges,
        point![0.0, 0.0, 0.0],
        vector![1.0, 1.0, 1.0],
    )
}

#[test]
fn out_of_domain_particle_fails_the_pass_and_is_excluded() {
    let positions = vec![
        ParticlePosition::new(point![4.5, 4.5, 4.5]),
        // Negative on one axis.
        ParticlePosition::new(point![-0.5, 4.5, 4.5]),
        // Past the local extent on one axis.
        ParticlePosition::new(point![4.5, 8.5, 4.5]),
    ];
    let charges = vec![1.0, 10.0, 10.0];

    let mut pipeline = pipeline_with(SpreadParameters::default(), positions.len());
    assert_eq!(
        run_pass(&mut pipeline, &positions, &charges),
        Err(SpreadError::OutOfDomain)
    );

    // Only the in-domain charge reached the brick.
    let deposited = pipeline.brick().unwrap().total();
    assert!((deposited - 1.0).abs() < 1.0e-5, "deposited {}", deposited);
}

#[test]
fn overflowing_cell_fails_the_pass_and_reverts_its_counter() {
    let capacity = 4;
    let params = SpreadParameters {
        cell_capacity: capacity,
        ..SpreadParameters::default()
    };

    // capacity + 1 particles in the same cell.
    let positions = vec![ParticlePosition::new(point![2.5, 2.5, 2.5]); capacity as usize + 1];
    let charges = vec![1.0; positions.len()];

    let mut pipeline = pipeline_with(params, positions.len());
    assert_eq!(
        run_pass(&mut pipeline, &positions, &charges),
        Err(SpreadError::CellOverflow)
    );

    let cells = pipeline.cells().unwrap();
    let shape = *pipeline.brick().unwrap().shape();
    let cell_id = shape.cell_index(vector![2, 2, 2]);
    assert_eq!(cells.count_of(cell_id), capacity);
}

#[test]
fn overflow_outranks_out_of_domain() {
    let capacity = 2;
    let params = SpreadParameters {
        cell_capacity: capacity,
        ..SpreadParameters::default()
    };

    let mut positions = vec![ParticlePosition::new(point![1.5, 1.5, 1.5]); capacity as usize + 1];
    positions.push(ParticlePosition::new(point![-3.0, 0.0, 0.0]));
    let charges = vec![1.0; positions.len()];

    let mut pipeline = pipeline_with(params, positions.len());
    assert_eq!(
        run_pass(&mut pipeline, &positions, &charges),
        Err(SpreadError::CellOverflow)
    );
}

#[test]
fn growing_the_capacity_recovers_from_overflow() {
    let params = SpreadParameters {
        cell_capacity: 2,
        ..SpreadParameters::default()
    };

    let positions = vec![ParticlePosition::new(point![5.5, 5.5, 5.5]); 6];
    let charges = vec![0.5; positions.len()];

    let mut pipeline = pipeline_with(params, positions.len());
    assert_eq!(
        run_pass(&mut pipeline, &positions, &charges),
        Err(SpreadError::CellOverflow)
    );

    // Grow the capacity, re-init, and re-run the pass.
    pipeline.set_params(SpreadParameters {
        cell_capacity: 16,
        ..SpreadParameters::default()
    });
    pipeline
        .init(
            positions.len(),
            positions.len(),
            GridRegion::from_extents(vector![EXTENT, EXTENT, EXTENT]),
            AssignmentStencil::new(ORDER).unwrap(),
        )
        .unwrap();
    run_pass(&mut pipeline, &positions, &charges).unwrap();

    let deposited = pipeline.brick().unwrap().total();
    assert!((deposited - 3.0).abs() < 1.0e-5);
}

#[test]
fn compute_before_init_is_rejected() {
    let mut pipeline = SpreadPipeline::new(SpreadParameters::default());
    let positions = vec![ParticlePosition::new(point![1.0, 1.0, 1.0])];
    let charges = vec![1.0];
    assert_eq!(
        run_pass(&mut pipeline, &positions, &charges),
        Err(SpreadError::Uninitialized)
    );
}

#[test]
fn buffers_only_grow() {
    let mut pipeline = pipeline_with(SpreadParameters::default(), 100);
    let high_water = pipeline.host_memory_usage();
    assert!(high_water > 0);

    // Shrinking the geometry and atom count keeps the allocations.
    pipeline
        .init(
            10,
            10,
            GridRegion::from_extents(vector![4, 4, 4]),
            AssignmentStencil::new(ORDER).unwrap(),
        )
        .unwrap();
    assert_eq!(pipeline.host_memory_usage(), high_water);

    // Growing the geometry grows them.
    pipeline
        .init(
            100,
            100,
            GridRegion::from_extents(vector![24, 24, 24]),
            AssignmentStencil::new(ORDER).unwrap(),
        )
        .unwrap();
    assert!(pipeline.host_memory_usage() > high_water);
}

#[test]
fn accounting_and_timings_are_reported() {
    let positions = vec![ParticlePosition::new(point![3.3, 3.3, 3.3]); 32];
    let charges = vec![1.0; positions.len()];

    let mut pipeline = pipeline_with(SpreadParameters::default(), positions.len());
    assert!(pipeline.bytes_per_atom() > 0);

    run_pass(&mut pipeline, &positions, &charges).unwrap();
    assert!(pipeline.timings().total >= pipeline.timings().map);

    pipeline.reset_timings();
    assert_eq!(*pipeline.timings(), SpreadTimings::default());
}
