use approx::assert_relative_eq;
use fea_engine::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const E: f64 = 200.0;
const I: f64 = 0.05;
const A: f64 = 0.4;

fn section() -> SectionMaterial {
    SectionMaterial::elastic(SectionParams {
        e: E,
        area: A,
        inertia: I,
    })
    .unwrap()
}

#[test]
fn cantilever_tip_load() {
    init_logging();
    let (length, p) = (3.0, 2.0);
    let mut system = System::new();
    let nodes: Vec<NodeId> = (0..=2)
        .map(|i| system.add_node(Node::new(i as f64 * length / 2.0, 0.0)))
        .collect();
    let section = section();
    for pair in nodes.windows(2) {
        system
            .add_element(Frame2D::new(pair[0], pair[1], &section, FrameConfig::default()).unwrap())
            .unwrap();
    }
    system
        .node_mut(nodes[0])
        .unwrap()
        .fix_dof(&[DofKind::Ux, DofKind::Uy, DofKind::Rz])
        .unwrap();
    system.node_mut(nodes[2]).unwrap().set_load(&[-p], &[DofKind::Uy]).unwrap();
    system.set_load_factor(1.0);

    LinearSolver::default().solve(&mut system).unwrap();

    let tip = system.node(nodes[2]).unwrap();
    let ei = E * I;
    let (w, theta) = (tip.dof(DofKind::Uy).unwrap().value(), tip.dof(DofKind::Rz).unwrap().value());
    assert_relative_eq!(w, -p * length.powi(3) / (3.0 * ei), epsilon = 1e-10);
    assert_relative_eq!(theta, -p * length.powi(2) / (2.0 * ei), epsilon = 1e-10);

    // fixed-end reactions: shear p upward, hogging moment p·L
    let report = system.report();
    let base = report.node(nodes[0]).unwrap();
    assert_relative_eq!(base.dof(DofKind::Uy).unwrap().reaction.unwrap(), p, epsilon = 1e-9);
    let moment = base.dof(DofKind::Rz).unwrap().reaction.unwrap();
    assert_relative_eq!(moment, p * length, epsilon = 1e-9);

    let root = system.internal_force(ElementId(0), 0.0).unwrap();
    assert_relative_eq!(root.moment, -p * length, epsilon = 1e-9);
    assert_relative_eq!(root.shear, p, epsilon = 1e-9);
    let quarter = system.internal_force(ElementId(0), 0.5).unwrap();
    assert_relative_eq!(quarter.moment, -p * 0.75 * length, epsilon = 1e-9);

    assert!(matches!(
        system.internal_force(ElementId(5), 0.5),
        Err(FEAError::UnknownElement(5))
    ));
}

#[test]
fn simply_supported_beam_with_uniform_load() {
    init_logging();
    let (length, q) = (4.0, 1.5);
    let mut system = System::new();
    let left = system.add_node(Node::new(0.0, 0.0));
    let mid = system.add_node(Node::new(length / 2.0, 0.0));
    let right = system.add_node(Node::new(length, 0.0));
    let section = section();
    for (i, j) in [(left, mid), (mid, right)] {
        let mut beam = Beam2D::new(i, j, &section, BeamConfig::default()).unwrap();
        beam.add_load(ElementLoad::transverse(-q)).unwrap();
        system.add_element(beam).unwrap();
    }
    system.node_mut(left).unwrap().fix_dof(&[DofKind::Uy]).unwrap();
    system.node_mut(right).unwrap().fix_dof(&[DofKind::Uy]).unwrap();

    NewtonRaphsonSolver::default().step(&mut system, 1.0).unwrap();

    let w = system.node(mid).unwrap().dof(DofKind::Uy).unwrap().value();
    assert_relative_eq!(w, -5.0 * q * length.powi(4) / (384.0 * E * I), epsilon = 1e-10);

    let m_mid = system.internal_force(ElementId(0), 1.0).unwrap();
    assert_relative_eq!(m_mid.moment, q * length.powi(2) / 8.0, epsilon = 1e-9);
    assert_relative_eq!(m_mid.shear, 0.0, epsilon = 1e-9);

    // both supports carry half the load
    for (_, r) in system.reactions().unwrap() {
        assert_relative_eq!(r, q * length / 2.0, epsilon = 1e-9);
    }
}

#[test]
fn element_load_factor_scales_independently() {
    init_logging();
    let length = 2.0;
    let mut system = System::new();
    let a = system.add_node(Node::new(0.0, 0.0));
    let b = system.add_node(Node::new(length, 0.0));
    let section = section();
    let mut frame = Frame2D::new(a, b, &section, FrameConfig::default()).unwrap();
    frame.add_load(ElementLoad::transverse(-1.0)).unwrap();
    let id = system.add_element(frame).unwrap();
    system
        .node_mut(a)
        .unwrap()
        .fix_dof(&[DofKind::Ux, DofKind::Uy, DofKind::Rz])
        .unwrap();

    let solver = LinearSolver::default();
    system.set_load_factor(1.0);
    solver.solve(&mut system).unwrap();
    let single = system.node(b).unwrap().dof(DofKind::Uy).unwrap().value();
    // cantilever under UDL: qL⁴/8EI
    assert_relative_eq!(single, -length.powi(4) / (8.0 * E * I), epsilon = 1e-10);

    system.reset_disp();
    system.element_mut(id).unwrap().set_load_factor(3.0);
    system.set_load_factor(0.5);
    solver.solve(&mut system).unwrap();
    let scaled = system.node(b).unwrap().dof(DofKind::Uy).unwrap().value();
    assert_relative_eq!(scaled, 1.5 * single, epsilon = 1e-10);

    system.reset_loads();
    system.reset_disp();
    solver.solve(&mut system).unwrap();
    assert_relative_eq!(system.node(b).unwrap().dof(DofKind::Uy).unwrap().value(), 0.0);
}

#[test]
fn large_rotation_frame_stiffens_under_tension() {
    init_logging();
    // tensioned cable-like frame: lateral stiffness grows with axial tension
    let length = 10.0;
    let build = |tension: f64| {
        let mut system = System::new();
        let a = system.add_node(Node::new(0.0, 0.0));
        let b = system.add_node(Node::new(length, 0.0));
        let frame = Frame2D::new(a, b, &section(), FrameConfig::default().finite()).unwrap();
        system.add_element(frame).unwrap();
        system
            .node_mut(a)
            .unwrap()
            .fix_dof(&[DofKind::Ux, DofKind::Uy, DofKind::Rz])
            .unwrap();
        system.node_mut(b).unwrap().set_load(&[tension], &[DofKind::Ux]).unwrap();
        system
    };

    let mut slack = build(0.0);
    let mut taut = build(5.0);
    let solver = NewtonRaphsonSolver::new(SolverOptions::default().with_max_iter(20));
    solver.step(&mut slack, 1.0).unwrap();
    solver.step(&mut taut, 1.0).unwrap();

    let k_slack = check_stability(&mut slack).unwrap();
    let k_taut = check_stability(&mut taut).unwrap();
    assert!(k_slack.stable && k_taut.stable);
    assert!(k_taut.min_eigenvalue > k_slack.min_eigenvalue);
}
