//! FEA Engine Example - Portal Frame with Yielding Sections

use anyhow::Context;
use fea_engine::prelude::*;
use log::info;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("=== FEA Engine Example: Portal Frame ===\n");

    //     N2 -------- N3
    //     |          |
    //     |          |
    //     N0        N1
    //   Fixed     Fixed
    let height = 4.0;
    let span = 6.0;

    let mut system = System::new();
    let n0 = system.add_node(Node::new(0.0, 0.0));
    let n1 = system.add_node(Node::new(span, 0.0));
    let n2 = system.add_node(Node::new(0.0, height));
    let n3 = system.add_node(Node::new(span, height));

    // Steel, 300 x 500 rectangle (SI units)
    let steel: FiberParams = from_options(&[("E", 200e9), ("fy", 250e6), ("H", 2e9)])?;
    let fiber = Fiber::new(steel)?;
    let section = SectionMaterial::rectangular(0.3, 0.5, 12, &fiber)?;

    let config = FrameConfig::default().finite();
    let col1 = system.add_element(Frame2D::new(n0, n2, &section, config.clone())?)?;
    let col2 = system.add_element(Frame2D::new(n1, n3, &section, config.clone())?)?;
    let beam = system.add_element(Frame2D::new(n2, n3, &section, config)?)?;

    let all = [DofKind::Ux, DofKind::Uy, DofKind::Rz];
    system.node_mut(n0)?.fix_dof(&all)?;
    system.node_mut(n1)?.fix_dof(&all)?;

    // 200 kN/m gravity on the beam, 400 kN lateral at roof level
    system
        .element_mut(beam)?
        .add_load(ElementLoad::transverse(-200e3))?;
    system.node_mut(n2)?.set_load(&[400e3], &[DofKind::Ux])?;

    system.start_recorder(vec![
        Probe::LoadFactor,
        Probe::Displacement {
            node: n2,
            dof: DofKind::Ux,
        },
        Probe::Reaction {
            node: n0,
            dof: DofKind::Ux,
        },
    ]);

    let options = SolverOptions::default().with_max_iter(25).with_tolerance(1e-8);
    let solver = NewtonRaphsonSolver::new(options);
    println!("Running Newton-Raphson to λ = 1.0 in 10 steps...\n");
    let steps = solver
        .solve_to(&mut system, 1.0, 10)
        .context("load stepping failed")?;
    info!("{} load steps accepted", steps.len());

    println!("Load-displacement curve (roof sway):");
    let lambdas = system.fetch_record(&Probe::LoadFactor)?;
    let sway = system.fetch_record(&Probe::Displacement {
        node: n2,
        dof: DofKind::Ux,
    })?;
    for (lambda, u) in lambdas.iter().zip(&sway) {
        println!("  λ = {:.2}: DX = {:.3}mm", lambda, u * 1000.0);
    }

    println!("\nInternal forces:");
    for (name, id) in [("Col1", col1), ("Col2", col2), ("Beam", beam)] {
        let start = system.internal_force(id, 0.0)?;
        let mid = system.internal_force(id, 0.5)?;
        println!(
            "  {}: N={:.2}kN, M(0)={:.2}kN·m, M(L/2)={:.2}kN·m",
            name,
            start.axial / 1000.0,
            start.moment / 1000.0,
            mid.moment / 1000.0
        );
    }

    let stability = check_stability(&mut system)?;
    println!(
        "\nTangent stiffness: min eigenvalue {:.3e}, stable = {}",
        stability.min_eigenvalue, stability.stable
    );

    let report = system.report();
    println!("\nSummary:");
    println!("  Free DOFs: {}", report.summary.free_dofs);
    println!("  Max displacement: {:.4}mm", report.summary.max_displacement * 1000.0);
    println!("  Max reaction: {:.2}kN", report.summary.max_reaction / 1000.0);

    println!("\n=== Analysis Complete ===");
    Ok(())
}
