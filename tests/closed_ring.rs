use std::{f64::consts::PI, process, sync::Arc};

use equator::assert;
use itertools::Itertools;
use kdrod::{
    elements::{beams::BeamBuilder, kernels::DofModel},
    geometry::Vector3,
    loads::{Load, Location},
    material::Material,
    model::Model,
    section::{CrossSection, SectionProperties},
    solver::{KdrSolver, SolverStatus},
};

fn circle(n: usize, r: f64) -> Vec<Vector3> {
    (0..n)
        .map(|i| {
            let a = 2. * PI * i as f64 / n as f64;
            Vector3::new(r * a.cos(), r * a.sin(), 0.)
        })
        .collect_vec()
}

fn section() -> Arc<SectionProperties> {
    // EA = 1000, EI = 1, GJ = 0.8
    Arc::new(
        SectionProperties::new(
            CrossSection::Custom {
                area: 1.,
                i1: 1e-3,
                i2: 1e-3,
                j: 2e-3,
            },
            Arc::new(Material::linear(1., 1000., 0.25, 0.)),
        )
        .unwrap(),
    )
}

fn solve(builder: BeamBuilder, tolerance: f64) -> KdrSolver {
    let mut model = Model::new();
    model.set_tolerances(tolerance, tolerance);
    model.add_beam(builder.build().unwrap());
    let mut solver = model.create_solver().unwrap();
    let report = solver.run();

    // Exit if failed to converge
    if report.status != SolverStatus::Converged {
        println!("failed! {:?}", report);
        process::exit(1);
    }
    solver
}

#[test]
fn test_ring_at_rest() {
    let builder = BeamBuilder::from_points(circle(24, 1.))
        .closed()
        .section(section());
    let solver = solve(builder, 1e-9);
    assert!(solver.iteration() == 0);

    let beam = solver.beam(0).unwrap();
    assert!(beam.n_edges() == 24);
    assert!(beam.energies().total().abs() < 1e-20);
}

#[test]
fn test_stretched_ring_recovers_rest_radius() {
    for model in [DofModel::Cable, DofModel::Rod4] {
        let builder = BeamBuilder::from_points(circle(24, 1.01))
            .rest_points(circle(24, 1.))
            .closed()
            .model(model)
            .section(section());
        let solver = solve(builder, 1e-9);

        let beam = solver.beam(0).unwrap();
        let centroid = beam
            .points()
            .iter()
            .fold(Vector3::ZERO, |c, &p| c + p / 24.);
        for p in beam.points() {
            assert!(((p - centroid).norm() - 1.).abs() < 1e-6);
        }
        assert!(beam.axial_force().norm_l2() < 1e-6);
    }
}

#[test]
fn test_ring_under_diametral_tension() {
    // Pulling a ring apart at both ends of a diameter lengthens that
    // diameter by (π/4 - 2/π) P R³ / EI
    let n = 40;
    let p = 1e-3;
    let builder = BeamBuilder::from_points(circle(n, 1.))
        .closed()
        .section(section())
        .load(Load::force(Location::Vertex(0), Vector3::X * p))
        .load(Load::force(Location::Vertex(n / 2), Vector3::X * -p));
    let solver = solve(builder, 1e-11);

    let points = solver.beam(0).unwrap().points();
    let elongation = (points[0] - points[n / 2]).norm() - 2.;
    let exact = (PI / 4. - 2. / PI) * p;
    println!("elongation = {elongation:.6e} ({exact:.6e})");
    assert!(((elongation - exact) / exact).abs() < 0.1);

    // The transverse diameter shrinks
    let transverse = (points[n / 4] - points[3 * n / 4]).norm() - 2.;
    assert!(transverse < 0.);

    // Loads are balanced, the ring stays in its plane
    assert!(points.iter().all(|p| p.z.abs() < 1e-12));
}
