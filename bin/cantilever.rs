use std::{env, process, sync::Arc};

use kdrod::{
    boundary::BoundaryKind,
    config::ModelInput,
    elements::beams::BeamBuilder,
    geometry::{Frame, Vector3},
    loads::{Load, Location},
    material::Material,
    model::Model,
    section::{CrossSection, SectionProperties},
    solver::SolverStatus,
};

fn main() {
    // Model from a YAML file, or the built-in tip-loaded cantilever
    let model = match env::args().nth(1) {
        Some(path) => ModelInput::from_file(&path).and_then(|input| input.build()),
        None => cantilever(),
    };
    let model = model.unwrap_or_else(|err| {
        eprintln!("error: {err}");
        process::exit(1);
    });

    let mut solver = model.create_solver().unwrap_or_else(|err| {
        eprintln!("error: {err}");
        process::exit(1);
    });
    solver.on_energy_peak(|s| {
        if s.peak_count() % 100 == 0 {
            println!("peak {:>5} at iteration {:>7}", s.peak_count(), s.iteration());
        }
    });

    let report = solver.run();
    println!(
        "{:?} after {} iterations, {} energy peaks",
        report.status, report.iterations, report.peaks
    );

    for beam in &solver.model().beams {
        let tip = beam.frames()[beam.n_vertices() - 1].origin;
        let e = beam.energies();
        println!(
            "beam {}: tip = [{:.6e}, {:.6e}, {:.6e}], energy: axial {:.4e}, bending {:.4e}, twisting {:.4e}",
            beam.id, tip.x, tip.y, tip.z, e.axial, e.bending, e.twisting
        );
    }

    if report.status != SolverStatus::Converged {
        process::exit(2);
    }
}

/// Unit cantilever with EI = 1 under a small tip load; the tip deflection
/// should approach P L³ / 3 EI.
fn cantilever() -> kdrod::Result<Model> {
    let p = 1e-3;
    let section = SectionProperties::new(
        CrossSection::Custom {
            area: 1.,
            i1: 1e-3,
            i2: 1e-3,
            j: 1.6e-3,
        },
        Arc::new(Material::linear(1., 1000., 0.25, 0.)),
    )?;
    let ei = section.ei1;

    let beam = BeamBuilder::straight(
        &Frame::new(Vector3::ZERO, Vector3::X, Vector3::Y),
        &Frame::new(Vector3::X, Vector3::X, Vector3::Y),
        20,
    )
    .section(Arc::new(section))
    .start(BoundaryKind::Clamped)
    .load(Load::force(Location::End, Vector3::Z * -p))
    .build()?;

    println!("expected tip deflection: {:.6e}", -p / (3. * ei));

    let mut model = Model::new();
    model.set_tolerances(1e-10, 1e-10);
    model.add_beam(beam);
    Ok(model)
}
