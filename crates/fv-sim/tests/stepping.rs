//! Time stepping of complete problems.

use fv_core::{ErrorKind, Real};
use fv_mesh::Grid1D;
use fv_sim::{SimError, SolveMode, StepperOptions, TimeStepper};
use fv_solver::{ConjugateGradient, DirectLu, IterativeConfig, NewtonConfig};
use fv_terms::{
    BoundaryCondition, DiffusionTerm, Equation, ImplicitSourceTerm, NonlinearOptions, SourceTerm,
    TransientTerm,
};
use fv_vars::{Location, VarGraph};
use proptest::prelude::*;

fn heat(graph: &mut VarGraph<'_>, mesh: &Grid1D, initial: Vec<Real>) -> (fv_core::VarId, Equation) {
    let phi = graph.primary("phi", Location::Cell, vec![], initial).unwrap();
    let eq = Equation::builder("heat", phi)
        .add(TransientTerm::default())
        .equals()
        .add(DiffusionTerm::new(0.2))
        .boundary(BoundaryCondition::fixed_value(mesh.faces_left(), 1.0))
        .solver(DirectLu)
        .build(graph)
        .unwrap();
    (phi, eq)
}

fn options(dt: Real) -> StepperOptions {
    StepperOptions {
        dt,
        mode: SolveMode::Linear,
    }
}

#[test]
fn heat_relaxes_towards_the_boundary_value() {
    let mesh = Grid1D::new(10, 0.1).unwrap();
    let mut graph = VarGraph::new(&mesh);
    let (phi, eq) = heat(&mut graph, &mesh, vec![0.0; 10]);
    let mut stepper = TimeStepper::new(vec![eq], options(0.5)).unwrap();

    let report = stepper.timestep(&mut graph, 200).unwrap();
    assert_eq!(report.steps, 200);
    assert_eq!(stepper.step(), 200);
    assert!((report.time - 100.0).abs() < 1e-12);

    // insulated right end: the steady state is uniform
    for v in graph.value(phi).unwrap().data() {
        assert!((v - 1.0).abs() < 1e-6, "{v}");
    }
    assert!(report.residuals[0] < 1e-6);
}

#[test]
fn old_value_tracks_the_previous_step() {
    let mesh = Grid1D::new(4, 0.25).unwrap();
    let mut graph = VarGraph::new(&mesh);
    let (phi, eq) = heat(&mut graph, &mesh, vec![0.0; 4]);
    let old = graph.old_of(phi).unwrap();
    let mut stepper = TimeStepper::new(vec![eq], options(0.1)).unwrap();

    stepper.timestep(&mut graph, 1).unwrap();
    let first = graph.value(phi).unwrap().data().to_vec();
    stepper.timestep(&mut graph, 1).unwrap();
    assert_eq!(graph.value(old).unwrap().data(), first.as_slice());
}

#[test]
fn implicit_euler_on_a_quadratic_decay() {
    let mesh = Grid1D::new(1, 1.0).unwrap();
    let mut graph = VarGraph::new(&mesh);
    let phi = graph.cell_var("phi", 1.0).unwrap();
    let rate = graph.neg(phi).unwrap();

    // d(phi)/dt == -phi * phi
    let eq = Equation::builder("decay", phi)
        .add(TransientTerm::default())
        .equals()
        .add(ImplicitSourceTerm::new(rate))
        .build(&mut graph)
        .unwrap();
    let opts = StepperOptions {
        dt: 0.1,
        mode: SolveMode::Nonlinear(NonlinearOptions::default()),
    };
    let mut stepper = TimeStepper::new(vec![eq], opts).unwrap();
    stepper.timestep(&mut graph, 1).unwrap();

    // 0.1 x^2 + x - 1 = 0
    let expected = (-1.0 + (1.4_f64).sqrt()) / 0.2;
    let v = graph.value(phi).unwrap().data()[0];
    assert!((v - expected).abs() < 1e-8, "{v} vs {expected}");
}

#[test]
fn failures_surface_without_counting_the_step() {
    let mesh = Grid1D::new(2, 1.0).unwrap();
    let mut graph = VarGraph::new(&mesh);
    let phi = graph.cell_var("phi", 1.0).unwrap();

    // phi * phi == -1
    let eq = Equation::builder("impossible", phi)
        .add(ImplicitSourceTerm::new(phi))
        .equals()
        .add(SourceTerm::new(-1.0))
        .build(&mut graph)
        .unwrap();
    let opts = StepperOptions {
        dt: 1.0,
        mode: SolveMode::Nonlinear(NonlinearOptions {
            newton: NewtonConfig {
                max_iterations: 5,
                ..Default::default()
            },
            ..Default::default()
        }),
    };
    let mut stepper = TimeStepper::new(vec![eq], opts).unwrap();

    let err = stepper.timestep(&mut graph, 3).unwrap_err();
    match &err {
        SimError::Equation { equation, step, .. } => {
            assert_eq!(equation, "impossible");
            assert_eq!(*step, 1);
        }
        other => panic!("unexpected error {other}"),
    }
    assert_ne!(err.kind(), ErrorKind::Configuration);
    assert_eq!(stepper.step(), 0);
    assert_eq!(graph.value(phi).unwrap().data(), &[1.0, 1.0]);
}

#[test]
fn a_failing_equation_rolls_back_the_whole_step() {
    let mesh = Grid1D::new(6, 0.5).unwrap();
    let mut graph = VarGraph::new(&mesh);
    let (phi, warm) = heat(&mut graph, &mesh, vec![0.25; 6]);
    let psi = graph.cell_var("psi", 0.5).unwrap();
    let starved = ConjugateGradient::new(IterativeConfig {
        tolerance: 1e-14,
        max_iterations: 1,
    });
    let cold = Equation::builder("cold", psi)
        .add(TransientTerm::default())
        .equals()
        .add(DiffusionTerm::new(0.2))
        .boundary(BoundaryCondition::fixed_value(mesh.faces_left(), -1.0))
        .solver(starved)
        .build(&mut graph)
        .unwrap();
    let phi_old = graph.old_of(phi).unwrap();
    let psi_old = graph.old_of(psi).unwrap();

    let mut stepper = TimeStepper::new(vec![warm, cold], options(0.5)).unwrap();
    for _ in 0..2 {
        let err = stepper.timestep(&mut graph, 1).unwrap_err();
        match &err {
            SimError::Equation { equation, step, .. } => {
                assert_eq!(equation, "cold");
                assert_eq!(*step, 1);
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(err.kind(), ErrorKind::Convergence);
        assert_eq!(stepper.step(), 0);

        // the first equation solved before the failure; nothing of it survives
        assert_eq!(graph.value(phi).unwrap().data(), &[0.25; 6]);
        assert_eq!(graph.value(phi_old).unwrap().data(), &[0.25; 6]);
        assert_eq!(graph.value(psi).unwrap().data(), &[0.5; 6]);
        assert_eq!(graph.value(psi_old).unwrap().data(), &[0.5; 6]);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn n_steps_equal_n_single_steps(
        n in 1usize..8,
        initial in prop::collection::vec(-1.0f64..1.0, 6),
    ) {
        let mesh = Grid1D::new(6, 0.5).unwrap();

        let mut g1 = VarGraph::new(&mesh);
        let (phi1, eq1) = heat(&mut g1, &mesh, initial.clone());
        let mut batch = TimeStepper::new(vec![eq1], options(0.05)).unwrap();
        let r1 = batch.timestep(&mut g1, n).unwrap();

        let mut g2 = VarGraph::new(&mesh);
        let (phi2, eq2) = heat(&mut g2, &mesh, initial);
        let mut single = TimeStepper::new(vec![eq2], options(0.05)).unwrap();
        let mut r2 = None;
        for _ in 0..n {
            r2 = Some(single.timestep(&mut g2, 1).unwrap());
        }
        let r2 = r2.unwrap();

        prop_assert_eq!(g1.value(phi1).unwrap().data(), g2.value(phi2).unwrap().data());
        prop_assert_eq!(batch.step(), single.step());
        prop_assert_eq!(r1.time, r2.time);
        prop_assert_eq!(r1.residuals, r2.residuals);
    }
}
