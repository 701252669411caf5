use ember3d::na::{point, vector};
use ember3d::prelude::*;

const ORDER: u32 = 5;
const EXTENT: u32 = 16;

fn random_particles(count: usize, seed: u64) -> (Vec<ParticlePosition>, Vec<u32>, Vec<Real>) {
    let mut rng = oorandom::Rand32::new(seed);
    let mut positions = Vec::with_capacity(count);
    let mut kinds = Vec::with_capacity(count);
    let mut charges = Vec::with_capacity(count);

    for _ in 0..count {
        positions.push(ParticlePosition::new(point![
            rng.rand_float() * EXTENT as Real,
            rng.rand_float() * EXTENT as Real,
            rng.rand_float() * EXTENT as Real
        ]));
        kinds.push(rng.rand_range(1..4));
        charges.push(rng.rand_float() * 2.0 - 1.0);
    }

    (positions, kinds, charges)
}

fn init_pipeline(params: SpreadParameters, count: usize) -> SpreadPipeline {
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
    kinds: &[u32],
    charges: &[Real],
    inv_spacing: Vector<Real>,
) -> Result<(), SpreadError> {
    pipeline.compute(
        0,
        positions.len(),
        positions.len(),
        positions,
        kinds,
        charges,
        point![0.0, 0.0, 0.0],
        inv_spacing,
    )
}

#[test]
fn deposited_charge_is_conserved() {
    let (positions, kinds, charges) = random_particles(500, 42);

    for &inv in &[1.0 as Real, 0.5] {
        let mut pipeline = init_pipeline(SpreadParameters::default(), positions.len());
        run_pass(
            &mut pipeline,
            &positions,
            &kinds,
            &charges,
            vector![inv, inv, inv],
        )
        .unwrap();

        let density_scale = inv * inv * inv;
        let expected: Real = charges.iter().sum::<Real>() * density_scale;
        let deposited = pipeline.brick().unwrap().total();
        let tolerance = charges.iter().map(|q| q.abs()).sum::<Real>() * density_scale * 1.0e-4;
        assert!(
            (deposited - expected).abs() <= tolerance,
            "inv_spacing {}: deposited {} expected {}",
            inv,
            deposited,
            expected
        );
    }
}

#[test]
fn conservation_holds_for_every_order() {
    let (positions, kinds, charges) = random_particles(200, 7);

    for order in 2..=7u32 {
        let mut pipeline = SpreadPipeline::new(SpreadParameters::default());
        pipeline
            .init(
                positions.len(),
                positions.len(),
                GridRegion::from_extents(vector![EXTENT, EXTENT, EXTENT]),
                AssignmentStencil::new(order).unwrap(),
            )
            .unwrap();
        run_pass(
            &mut pipeline,
            &positions,
            &kinds,
            &charges,
            vector![1.0, 1.0, 1.0],
        )
        .unwrap();

        let expected: Real = charges.iter().sum();
        let deposited = pipeline.brick().unwrap().total();
        let tolerance = charges.iter().map(|q| q.abs()).sum::<Real>() * 1.0e-4;
        assert!(
            (deposited - expected).abs() <= tolerance,
            "order {}: deposited {} expected {}",
            order,
            deposited,
            expected
        );
    }
}

#[test]
fn all_strategies_produce_the_same_grid() {
    let (positions, kinds, charges) = random_particles(800, 1234);
    let inv_spacing = vector![1.0, 1.0, 1.0];

    let mut grids = Vec::new();
    for strategy in [
        SpreadStrategy::Scatter,
        SpreadStrategy::TiledGather,
        SpreadStrategy::ResequencedScatter,
    ] {
        let params = SpreadParameters {
            strategy,
            ..SpreadParameters::default()
        };
        let mut pipeline = init_pipeline(params, positions.len());
        run_pass(&mut pipeline, &positions, &kinds, &charges, inv_spacing).unwrap();
        grids.push(pipeline.brick().unwrap().values().to_vec());
    }

    let max_abs = grids[0]
        .iter()
        .fold(0.0 as Real, |acc, v| acc.max(v.abs()));
    let tolerance = max_abs * 1.0e-5 + 1.0e-7;

    for other in &grids[1..] {
        assert_eq!(grids[0].len(), other.len());
        for (a, b) in grids[0].iter().zip(other.iter()) {
            assert!(
                (a - b).abs() <= tolerance,
                "grids diverge: {} vs {} (tolerance {})",
                a,
                b,
                tolerance
            );
        }
    }
}

#[test]
fn single_particle_deposits_only_inside_its_stencil_cube() {
    let positions = vec![ParticlePosition::new(point![7.3, 8.6, 5.1])];
    let kinds = vec![1];
    let charges = vec![1.0];

    let mut pipeline = init_pipeline(SpreadParameters::default(), 1);
    run_pass(
        &mut pipeline,
        &positions,
        &kinds,
        &charges,
        vector![1.0, 1.0, 1.0],
    )
    .unwrap();

    let stencil = AssignmentStencil::new(ORDER).unwrap();
    let cell = vector![7, 8, 5];
    let brick = pipeline.brick().unwrap();
    let shape = *brick.shape();
    let ghost = shape.ghost as i32;

    for z in -ghost..shape.nlocal.z as i32 + ghost {
        for y in -ghost..shape.nlocal.y as i32 + ghost {
            for x in -ghost..shape.nlocal.x as i32 + ghost {
                let value = brick.value_at(vector![x, y, z]);
                let inside = (x - cell.x) >= stencil.nlower()
                    && (x - cell.x) <= stencil.nupper()
                    && (y - cell.y) >= stencil.nlower()
                    && (y - cell.y) <= stencil.nupper()
                    && (z - cell.z) >= stencil.nlower()
                    && (z - cell.z) <= stencil.nupper();
                if !inside {
                    assert_eq!(value, 0.0, "leaked charge at ({}, {}, {})", x, y, z);
                }
            }
        }
    }

    // The cube as a whole holds the entire charge.
    assert!((brick.total() - 1.0).abs() < 1.0e-5);
}

#[test]
fn zero_separated_passes_are_identical() {
    let (positions, kinds, charges) = random_particles(300, 99);
    let inv_spacing = vector![1.0, 1.0, 1.0];

    // The gather strategy is deterministic point by point, so two passes
    // agree bitwise.
    let params = SpreadParameters {
        strategy: SpreadStrategy::TiledGather,
        ..SpreadParameters::default()
    };
    let mut pipeline = init_pipeline(params, positions.len());

    run_pass(&mut pipeline, &positions, &kinds, &charges, inv_spacing).unwrap();
    let first = pipeline.brick().unwrap().values().to_vec();

    run_pass(&mut pipeline, &positions, &kinds, &charges, inv_spacing).unwrap();
    let second = pipeline.brick().unwrap().values().to_vec();

    assert_eq!(first, second);

    // The racing scatter agrees within accumulation-order tolerance.
    let params = SpreadParameters::default();
    let mut pipeline = init_pipeline(params, positions.len());
    run_pass(&mut pipeline, &positions, &kinds, &charges, inv_spacing).unwrap();
    let third = pipeline.brick().unwrap().values().to_vec();
    run_pass(&mut pipeline, &positions, &kinds, &charges, inv_spacing).unwrap();
    let fourth = pipeline.brick().unwrap().values().to_vec();

    let max_abs = third.iter().fold(0.0 as Real, |acc, v| acc.max(v.abs()));
    for (a, b) in third.iter().zip(fourth.iter()) {
        assert!((a - b).abs() <= max_abs * 1.0e-5 + 1.0e-7);
    }
}

#[test]
fn particles_on_cell_boundaries_stay_in_bounds() {
    // Corners, edges, and the far boundary of the last cell.
    let positions = vec![
        ParticlePosition::new(point![0.0, 0.0, 0.0]),
        ParticlePosition::new(point![15.999, 15.999, 15.999]),
        ParticlePosition::new(point![8.0, 0.0, 15.5]),
    ];
    let kinds = vec![1, 1, 1];
    let charges = vec![0.5, -0.25, 1.0];

    for strategy in [
        SpreadStrategy::Scatter,
        SpreadStrategy::TiledGather,
        SpreadStrategy::ResequencedScatter,
    ] {
        let params = SpreadParameters {
            strategy,
            ..SpreadParameters::default()
        };
        let mut pipeline = init_pipeline(params, positions.len());
        run_pass(
            &mut pipeline,
            &positions,
            &kinds,
            &charges,
            vector![1.0, 1.0, 1.0],
        )
        .unwrap();

        let expected: Real = charges.iter().sum();
        let deposited = pipeline.brick().unwrap().total();
        assert!(
            (deposited - expected).abs() < 1.0e-5,
            "{:?}: {} vs {}",
            strategy,
            deposited,
            expected
        );
    }
}
