use std::{f64::consts::PI, process, sync::Arc};

use equator::assert;
use kdrod::{
    boundary::BoundaryKind,
    elements::beams::{Beam, BeamBuilder},
    geometry::{Frame, Vector3},
    loads::{Load, Location},
    material::Material,
    model::Model,
    section::{CrossSection, SectionProperties},
    solver::{KdrSolver, SolverStatus},
};

/// Section with EA = `ea`, EI1 = `ei1`, EI2 = `ei2` and GJ = 0.8.
fn section(ea: f64, ei1: f64, ei2: f64) -> Arc<SectionProperties> {
    // G = E / 2.5 with ν = 0.25
    let e = ea;
    Arc::new(
        SectionProperties::new(
            CrossSection::Custom {
                area: 1.,
                i1: ei1 / e,
                i2: ei2 / e,
                j: 0.8 * 2.5 / e,
            },
            Arc::new(Material::linear(1., e, 0.25, 0.)),
        )
        .unwrap(),
    )
}

/// Unit-length beam along X with d1 = Y and d2 = Z.
fn beam_x(n: usize, section: Arc<SectionProperties>) -> BeamBuilder {
    BeamBuilder::straight(
        &Frame::new(Vector3::ZERO, Vector3::X, Vector3::Y),
        &Frame::new(Vector3::X, Vector3::X, Vector3::Y),
        n,
    )
    .section(section)
}

fn solve(beam: Beam, tolerance: f64) -> KdrSolver {
    let mut model = Model::new();
    model.set_tolerances(tolerance, tolerance);
    model.add_beam(beam);
    let mut solver = model.create_solver().unwrap();
    let report = solver.run();

    // Exit if failed to converge
    if report.status != SolverStatus::Converged {
        println!("failed! {:?}", report);
        process::exit(1);
    }
    solver
}

fn tip(solver: &KdrSolver) -> Frame {
    let beam = solver.beam(0).unwrap();
    beam.frames()[beam.n_vertices() - 1]
}

#[test]
fn test_cantilever_tip_load_refinement() {
    // Small tip load, δ = P L³ / 3 EI
    let p = 1e-3;
    let exact = p / 3.;

    let errors = [5, 10, 20]
        .iter()
        .map(|&n| {
            let beam = beam_x(n, section(100., 1., 1.))
                .start(BoundaryKind::Clamped)
                .load(Load::force(Location::End, Vector3::Z * -p))
                .build()
                .unwrap();
            let solver = solve(beam, 1e-9);
            let deflection = -tip(&solver).origin.z;
            println!("n = {n:>2}: deflection = {deflection:.6e} ({exact:.6e})");
            (deflection - exact).abs() / exact
        })
        .collect::<Vec<_>>();

    assert!(errors[1] < 0.01);
    assert!(errors[2] < 0.003);
    assert!(errors[0] > errors[1]);
    assert!(errors[1] > errors[2]);
}

#[test]
fn test_cantilever_reactions_balance_load() {
    let p = Vector3::new(0., 2e-4, -1e-3);
    let beam = beam_x(10, section(1000., 1., 1.))
        .start(BoundaryKind::Clamped)
        .load(Load::force(Location::End, p))
        .build()
        .unwrap();
    let solver = solve(beam, 1e-10);
    let beam = solver.beam(0).unwrap();

    let reaction = beam.reaction_force(0);
    assert!((reaction + p).norm() < 1e-8);
    assert!(beam.reaction_force(5) == Vector3::ZERO);

    // The last edge carries the tip load as shear
    assert!((beam.shear_force()[9] - p).norm() < 1e-5);
    assert!(beam.energies().bending > 0.);
}

#[test]
fn test_cantilever_curls_into_half_circle() {
    // Tip moment M = π EI / L bends the beam into a half circle of radius L/π
    let n = 20;
    let beam = beam_x(n, section(1000., 1., 1.))
        .start(BoundaryKind::Clamped)
        .load(Load::moment(Location::End, Vector3::Y * (PI / 2.)))
        .build()
        .unwrap();
    let solver = solve(beam, 1e-8);

    // Quarter circle of radius 2/π
    let r = 2. / PI;
    let x = tip(&solver).origin;
    println!("tip = {x:?}");
    assert!((x.x - r).abs() < 0.005);
    assert!(x.y.abs() < 1e-9);
    assert!((x.z + r).abs() < 0.005);

    // Uniform curvature
    let beam = solver.beam(0).unwrap();
    let k = beam.curvature();
    (1..n).for_each(|i| assert!((k[i].norm() - PI / 2.).abs() < 0.01));
}

#[test]
fn test_cantilever_twist() {
    // Tip torque T rotates the tip section by T L / GJ
    let torque = 0.1;
    let beam = beam_x(10, section(1000., 1., 1.))
        .start(BoundaryKind::Clamped)
        .load(Load::moment(Location::End, Vector3::X * torque))
        .build()
        .unwrap();
    let solver = solve(beam, 1e-10);

    let d1 = tip(&solver).xaxis;
    let angle = d1.z.atan2(d1.y);
    assert!((angle - torque / 0.8).abs() < 1e-6);
    assert!(tip(&solver).origin.y.abs() < 1e-9);

    let beam = solver.beam(0).unwrap();
    let q = beam.twisting_moment();
    let tau = beam.twist();
    (0..10).for_each(|j| {
        assert!((q[j] - torque).abs() < 1e-8);
        assert!((tau[j] - torque / 0.8).abs() < 1e-6);
    });
    assert!((beam.reaction_torque(0) + torque).abs() < 1e-8);
    assert!(beam.reaction_torque(10) == 0.);
}

#[test]
fn test_anisotropic_section() {
    // EI1 = 1 about d1 = Y, EI2 = 4 about d2 = Z
    let run = |p: Vector3| {
        let beam = beam_x(10, section(1000., 1., 4.))
            .start(BoundaryKind::Clamped)
            .load(Load::force(Location::End, p))
            .build()
            .unwrap();
        tip(&solve(beam, 1e-10)).origin
    };

    let soft = run(Vector3::Z * -1e-3);
    let stiff = run(Vector3::Y * -1e-3);
    println!("soft = {soft:?}, stiff = {stiff:?}");
    assert!((soft.z + 3.35e-4).abs() < 2e-6);
    assert!((stiff.y + 8.375e-5).abs() < 1e-6);
    assert!((soft.z / stiff.y - 4.).abs() < 0.05);

    // Oblique load converges too
    let oblique = run(Vector3::new(0., -0.5e-3, -0.5e-3));
    assert!(oblique.z < oblique.y);
}

#[test]
fn test_pinned_pinned_unloaded_is_in_equilibrium() {
    let beam = beam_x(10, section(1000., 1., 4.))
        .start(BoundaryKind::Pinned)
        .end(BoundaryKind::Pinned)
        .build()
        .unwrap();
    let solver = solve(beam, 1e-6);
    assert!(solver.iteration() == 0);
}

#[test]
fn test_simply_supported_uniform_load() {
    // Midspan deflection 5 q L⁴ / 384 EI
    let n = 20;
    let q = -1e-3;
    let mut builder = beam_x(n, section(1000., 1., 1.))
        .start(BoundaryKind::Pinned)
        .end(BoundaryKind::Pinned);
    for j in 0..n {
        builder = builder.load(Load::force(Location::Edge(j), Vector3::Z * q));
    }
    let solver = solve(builder.build().unwrap(), 1e-11);

    let exact = 5. * q / 384.;
    let mid = solver.beam(0).unwrap().frames()[n / 2].origin.z;
    println!("midspan = {mid:.6e} ({exact:.6e})");
    assert!(((mid - exact) / exact).abs() < 0.01);

    // Each support carries half of the load
    let beam = solver.beam(0).unwrap();
    assert!((beam.reaction_force(0).z + q / 2.).abs() < 1e-9);
    assert!((beam.reaction_force(n).z + q / 2.).abs() < 1e-9);
    let supports = beam.reactions().iter().map(|&(i, _)| i).collect::<Vec<_>>();
    assert!(supports == vec![0, n]);
}

#[test]
fn test_rotated_support_turns_unloaded_beam() {
    // A clamp rotated by θ about Y swings the beam rigidly
    let theta: f64 = 0.1;
    let support = Frame::new(
        Vector3::ZERO,
        Vector3::new(theta.cos(), 0., -theta.sin()),
        Vector3::Y,
    );
    let beam = beam_x(10, section(1000., 1., 1.))
        .start(BoundaryKind::Clamped)
        .impose_start(support)
        .build()
        .unwrap();
    let solver = solve(beam, 1e-10);

    let x = tip(&solver).origin;
    assert!((x - Vector3::new(theta.cos(), 0., -theta.sin())).norm() < 1e-6);
    assert!(solver.model().elastic_energy() < 1e-12);

    // The rest configuration is untouched
    let beam = solver.beam(0).unwrap();
    assert!((beam.rest_frames()[10].origin - Vector3::X).norm() < 1e-15);
}

#[test]
fn test_end_clamped_cantilever() {
    // Same cantilever held at the other end
    let p = 1e-3;
    let beam = beam_x(10, section(1000., 1., 1.))
        .end(BoundaryKind::Clamped)
        .load(Load::force(Location::Start, Vector3::Z * -p))
        .build()
        .unwrap();
    let solver = solve(beam, 1e-10);
    let beam = solver.beam(0).unwrap();

    let exact = -p / 3.;
    let z = beam.frames()[0].origin.z;
    println!("free end = {z:.6e} ({exact:.6e})");
    assert!(((z - exact) / exact).abs() < 0.01);
    assert!((beam.frames()[10].origin - Vector3::X).norm() < 1e-12);
    assert!((beam.reaction_force(10).z - p).abs() < 1e-8);
    assert!(beam.reaction_force(0) == Vector3::ZERO);
}

/// Uniform load `q` on a unit beam of `n` edges with the same support at
/// both ends. Returns the midspan and start vertex heights.
fn uniform_load(n: usize, q: f64, support: BoundaryKind) -> (f64, f64) {
    let mut builder = beam_x(n, section(1000., 1., 1.)).start(support).end(support);
    for j in 0..n {
        builder = builder.load(Load::force(Location::Edge(j), Vector3::Z * q));
    }
    let solver = solve(builder.build().unwrap(), 1e-10);
    let frames = solver.beam(0).unwrap().frames();
    (frames[n / 2].origin.z, frames[0].origin.z)
}

#[test]
fn test_translational_springs_act_as_pins() {
    let (n, q, k) = (20, -1e-3, 1e4);
    let springs = BoundaryKind::Elastic {
        translational: k,
        rotational: 0.,
    };
    let (mid, start) = uniform_load(n, q, springs);

    // Each spring carries half of the load
    assert!((start - q / 2. / k).abs() < 1e-10);

    // Simply supported deflection plus the support settlement
    let exact = 5. * q / 384. + q / 2. / k;
    println!("midspan = {mid:.6e} ({exact:.6e})");
    assert!(((mid - exact) / exact).abs() < 0.01);
}

#[test]
fn test_rotational_springs_restrain_ends() {
    let (n, q, k) = (20, -1e-3, 1e4);
    let hinged = uniform_load(
        n,
        q,
        BoundaryKind::Elastic {
            translational: k,
            rotational: 0.,
        },
    )
    .0;
    let restrained = uniform_load(
        n,
        q,
        BoundaryKind::Elastic {
            translational: k,
            rotational: 1.,
        },
    )
    .0;

    // End moments q L² / 12 / (1 + 2 EI / k_r L) = q / 36 with k_r = EI
    let exact = q * (5. / 384. - 1. / 288.) + q / 2. / k;
    println!("hinged = {hinged:.6e}, restrained = {restrained:.6e} ({exact:.6e})");
    assert!(((restrained - exact) / exact).abs() < 0.03);
    assert!(restrained.abs() < hinged.abs());
    assert!(restrained.abs() > (q / 384.).abs());
}

#[test]
fn test_rotational_spring_cantilever() {
    // δ = P L³ / 3 EI + P L² / k_r + P / k_t
    let p = 1e-3;
    let run = |translational: f64, rotational: f64| {
        let beam = beam_x(10, section(1000., 1., 1.))
            .start(BoundaryKind::Elastic {
                translational,
                rotational,
            })
            .load(Load::force(Location::End, Vector3::Z * -p))
            .build()
            .unwrap();
        -tip(&solve(beam, 1e-10)).origin.z
    };

    let soft = run(1e4, 10.);
    let exact = p * (1. / 3. + 1. / 10. + 1e-4);
    println!("soft = {soft:.6e} ({exact:.6e})");
    assert!(((soft - exact) / exact).abs() < 0.03);

    // A stiff spring approaches the clamp
    let stiff = run(1e4, 1e3);
    let exact = p / 3.;
    println!("stiff = {stiff:.6e} ({exact:.6e})");
    assert!(((stiff - exact) / exact).abs() < 0.03);
    assert!(stiff < soft);
}
