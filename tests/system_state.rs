use approx::assert_relative_eq;
use fea_engine::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Chain of frames along x
fn chain(n: usize) -> (System, Vec<NodeId>) {
    let mut system = System::new();
    let nodes: Vec<NodeId> = (0..=n).map(|i| system.add_node(Node::new(i as f64, 0.0))).collect();
    let section = SectionMaterial::elastic(SectionParams::default()).unwrap();
    for pair in nodes.windows(2) {
        system
            .add_element(Frame2D::new(pair[0], pair[1], &section, FrameConfig::default()).unwrap())
            .unwrap();
    }
    (system, nodes)
}

#[test]
fn fixed_dofs_never_numbered() {
    init_logging();
    let kinds = [DofKind::Ux, DofKind::Uy, DofKind::Rz];
    let (mut system, nodes) = chain(5);

    // walk through fix/release patterns, checking numbering after each change
    for pattern in 0u32..64 {
        for (i, &node) in nodes.iter().enumerate() {
            let kind = kinds[i % 3];
            let node = system.node_mut(node).unwrap();
            if pattern & (1 << i) != 0 {
                node.fix_dof(&[kind]).unwrap();
            } else if node.is_fixed(kind).unwrap() && (pattern + i as u32) % 3 == 0 {
                node.release_dof(&[kind]).unwrap();
            }
        }

        let free = system.free_dofs();
        for handle in &free {
            assert!(!system.node(handle.node).unwrap().is_fixed(handle.kind).unwrap());
        }
        let fixed_count: usize = system
            .nodes()
            .iter()
            .map(|n| n.dofs().iter().filter(|d| d.is_fixed()).count())
            .sum();
        assert_eq!(free.len() + fixed_count, 3 * nodes.len());
        for node in system.nodes() {
            for dof in node.dofs() {
                assert_eq!(dof.is_fixed(), dof.index().is_none());
            }
        }
        // equation numbers are dense and follow node order
        let indices: Vec<usize> = system
            .nodes()
            .iter()
            .flat_map(|n| n.dofs().iter().filter_map(|d| d.index()))
            .collect();
        assert_eq!(indices, (0..free.len()).collect::<Vec<_>>());
    }
}

#[test]
fn push_then_pop_is_identity() {
    init_logging();
    let (mut system, nodes) = chain(3);
    let all = [DofKind::Ux, DofKind::Uy, DofKind::Rz];
    system.node_mut(nodes[0]).unwrap().fix_dof(&all).unwrap();
    system.node_mut(nodes[3]).unwrap().set_load(&[0.1, -0.2, 0.05], &all).unwrap();
    NewtonRaphsonSolver::default().step(&mut system, 0.7).unwrap();

    let before = system.snapshot();
    let histories: Vec<Vec<Vec<f64>>> = system
        .elements()
        .iter()
        .map(|e| e.materials().iter().map(|m| m.history()).collect())
        .collect();

    system.push_state();
    system.pop_state().unwrap();

    assert_eq!(system.load_factor(), before.load_factor());
    for &node in &nodes {
        assert_eq!(system.node(node).unwrap().displacement(), before.displacement(node).unwrap());
    }
    for (element, saved) in system.elements().iter().zip(&histories) {
        let now: Vec<Vec<f64>> = element.materials().iter().map(|m| m.history()).collect();
        assert_eq!(&now, saved);
    }
}

#[test]
fn prescribed_displacement_enters_residual() {
    init_logging();
    let mut system = System::new();
    let a = system.add_node(Node::new(0.0, 0.0));
    let b = system.add_node(Node::new(1.0, 0.0));
    let c = system.add_node(Node::new(2.0, 0.0));
    for (i, j) in [(a, b), (b, c)] {
        let material = Box::new(Elastic::with_modulus(10.0));
        let bar = Truss::new(i, j, material, TrussConfig::default()).unwrap();
        system.add_element(bar).unwrap();
    }
    for id in [a, b, c] {
        system.node_mut(id).unwrap().fix_dof(&[DofKind::Uy]).unwrap();
    }
    system.node_mut(a).unwrap().fix_dof(&[DofKind::Ux]).unwrap();
    // pull the far end by 0.2
    let far = system.node_mut(c).unwrap();
    far.fix_dof(&[DofKind::Ux]).unwrap();
    far.set_disp(&[0.2], &[DofKind::Ux]).unwrap();

    NewtonRaphsonSolver::default().solve(&mut system).unwrap();
    let mid = system.node(b).unwrap().dof(DofKind::Ux).unwrap().value();
    assert_relative_eq!(mid, 0.1, epsilon = 1e-12);
    assert_relative_eq!(system.node(c).unwrap().dof(DofKind::Ux).unwrap().value(), 0.2);

    // each bar stretched by 0.1: force 1
    let reaction = system
        .reactions()
        .unwrap()
        .into_iter()
        .find(|(h, _)| h.node == c && h.kind == DofKind::Ux)
        .unwrap()
        .1;
    assert_relative_eq!(reaction, 1.0, epsilon = 1e-12);
}

/// Bars of unequal stiffness in series, far end driven to `pull` with no loads
fn driven_pair(kinematics: Kinematics, pull: f64) -> (System, [NodeId; 3]) {
    let mut system = System::new();
    let ids = [
        system.add_node(Node::new(0.0, 0.0)),
        system.add_node(Node::new(1.0, 0.0)),
        system.add_node(Node::new(2.0, 0.0)),
    ];
    let config = TrussConfig {
        kinematics,
        ..TrussConfig::default()
    };
    for (pair, e) in ids.windows(2).zip([7.0, 13.0]) {
        let material = Box::new(Elastic::with_modulus(e));
        let bar = Truss::new(pair[0], pair[1], material, config.clone()).unwrap();
        system.add_element(bar).unwrap();
    }
    for id in ids {
        system.node_mut(id).unwrap().fix_dof(&[DofKind::Uy]).unwrap();
    }
    system.node_mut(ids[0]).unwrap().fix_dof(&[DofKind::Ux]).unwrap();
    let far = system.node_mut(ids[2]).unwrap();
    far.fix_dof(&[DofKind::Ux]).unwrap();
    far.set_disp(&[pull], &[DofKind::Ux]).unwrap();
    (system, ids)
}

fn end_reactions(system: &System, ids: &[NodeId; 3]) -> (f64, f64) {
    let reactions = system.reactions().unwrap();
    let rx = |node: NodeId| {
        reactions
            .iter()
            .find(|(h, _)| h.node == node && h.kind == DofKind::Ux)
            .unwrap()
            .1
    };
    (rx(ids[0]), rx(ids[2]))
}

#[test]
fn prescribed_displacement_alone_converges() {
    init_logging();
    for method in [LinearSolve::Lu, LinearSolve::Cholesky, LinearSolve::ConjugateGradient] {
        let (mut system, ids) = driven_pair(Kinematics::Linear, 0.3);
        let solver = NewtonRaphsonSolver::new(SolverOptions::default().with_linear_solve(method));
        let stats = solver.solve(&mut system).unwrap();
        assert!(stats.converged);
        assert!(stats.iterations <= 2);

        // springs 7 and 13 in series: u = 13·0.3/20
        let mid = system.node(ids[1]).unwrap().dof(DofKind::Ux).unwrap().value();
        assert_relative_eq!(mid, 0.195, epsilon = 1e-12);
        let (left, right) = end_reactions(&system, &ids);
        assert_relative_eq!(right, 7.0 * 0.195, epsilon = 1e-10);
        assert_relative_eq!(left, -right, epsilon = 1e-10);
    }
}

#[test]
fn prescribed_displacement_alone_converges_with_finite_bars() {
    init_logging();
    let (mut system, ids) = driven_pair(Kinematics::Finite, 0.3);
    let solver = NewtonRaphsonSolver::new(SolverOptions::default().with_max_iter(20));
    let stats = solver.solve(&mut system).unwrap();
    assert!(stats.converged);
    assert_eq!(system.stack_depth(), 0);

    // the softer bar takes the larger share of the stretch
    let mid = system.node(ids[1]).unwrap().dof(DofKind::Ux).unwrap().value();
    assert!(mid > 0.15 && mid < 0.3);
    let (left, right) = end_reactions(&system, &ids);
    assert!(right > 0.0);
    assert_relative_eq!(left, -right, epsilon = 1e-9);
}

#[test]
fn options_build_materials_by_name() {
    let params: FiberParams = from_options(&[("E", 210e9), ("fy", 355e6)]).unwrap();
    assert_eq!(params.e, 210e9);
    assert_eq!(params.hardening, 0.0);
    assert!(from_options::<FiberParams>(&[("Young", 1.0)]).is_err());

    let truss: TrussConfig = from_options(&[("A", 0.01)]).unwrap();
    assert_eq!(truss.area, 0.01);
    assert_eq!(truss.kinematics, Kinematics::Linear);
}
