//! End-to-end properties of the pipeline choreography, exercised without a
//! GPU device: the chain, the pass planner, the animator and the area
//! projector together implement the frame contract.

use glam::Vec3;

use afterglow::animator::ParamAnimator;
use afterglow::area::project_area;
use afterglow::camera::Camera;
use afterglow::chain::FilterChain;
use afterglow::filter::{EffectRegistry, FilterKind};
use afterglow::gpu::ping_pong::{plan_bloom, plan_chain, Buffer, Target};
use afterglow::settings::EffectSettings;

#[test]
fn copy_only_chain_is_single_pass_through() {
    let chain = FilterChain::new();
    assert_eq!(chain.entries(), &[FilterKind::Copy]);

    let plan = plan_chain(chain.len(), Buffer::A);
    assert_eq!(plan.passes.len(), 1);
    assert_eq!(plan.passes[0].input, Buffer::A);
    assert_eq!(plan.passes[0].output, Target::Presentation);
}

#[test]
fn tint_invert_chain_ping_pongs_a_b() {
    let chain = FilterChain::from_entries(vec![FilterKind::Tint, FilterKind::Invert]);
    let plan = plan_chain(chain.len(), Buffer::A);

    // Two stages: A -> B, then B -> presentation.
    assert_eq!(plan.passes.len(), 2);
    assert_eq!(plan.passes[0].input, Buffer::A);
    assert_eq!(plan.passes[0].output, Target::PingPong(Buffer::B));
    assert_eq!(plan.passes[1].input, Buffer::B);
    assert_eq!(plan.passes[1].output, Target::Presentation);
}

#[test]
fn long_chains_are_hazard_free() {
    for len in 1..=12 {
        for start in [Buffer::A, Buffer::B] {
            let plan = plan_chain(len, start);
            for pass in &plan.passes {
                assert_ne!(Target::PingPong(pass.input), pass.output);
            }
        }
    }
}

#[test]
fn bloom_runs_three_internal_passes_before_composite() {
    // The sub-sequence is fixed regardless of the bloom entry's position in
    // the outer chain: extract, horizontal blur, vertical blur, composite.
    for outer_len in 1..=4 {
        for position in 0..outer_len {
            let outer = plan_chain(outer_len, Buffer::A);
            let stage = outer.passes[position];
            let bloom = plan_bloom(stage.input);

            // Extract reads the scene buffer, the blurs bounce between the
            // intermediate and the scratch buffer, the composite re-reads
            // the untouched scene buffer.
            assert_eq!(bloom.extract_input, stage.input);
            assert_ne!(bloom.blur_scratch, stage.input);
            assert_eq!(bloom.composite_scene, stage.input);
        }
    }
}

#[test]
fn bloom_does_not_disturb_outer_flip_sequence() {
    // Replacing any stage with a bloom stage leaves the outer plan valid:
    // its scratch buffer is exactly the outer stage's write target.
    let outer = plan_chain(3, Buffer::A);
    for stage in &outer.passes {
        let bloom = plan_bloom(stage.input);
        match stage.output {
            Target::PingPong(buffer) => assert_eq!(bloom.blur_scratch, buffer),
            Target::Presentation => assert_eq!(bloom.blur_scratch, stage.input.other()),
        }
    }
}

#[test]
fn removing_sole_filter_keeps_chain_intact() {
    let mut chain = FilterChain::new();
    assert!(!chain.remove(0));
    assert_eq!(chain.len(), 1);
    // The surviving chain still plans a valid frame.
    let plan = plan_chain(chain.len(), Buffer::A);
    assert_eq!(plan.passes.last().unwrap().output, Target::Presentation);
}

#[test]
fn boundary_reorders_are_noops() {
    let mut chain = FilterChain::from_entries(vec![
        FilterKind::Retro,
        FilterKind::Bloom,
        FilterKind::Gameboy,
    ]);
    assert!(!chain.move_up(0));
    assert!(!chain.move_down(2));
    assert_eq!(
        chain.entries(),
        &[FilterKind::Retro, FilterKind::Bloom, FilterKind::Gameboy]
    );
}

#[test]
fn burn_level_tracks_cumulative_time_modulo_one() {
    let settings = EffectSettings::default();
    let mut animator = ParamAnimator::new(&settings);
    let dt = 1.0 / 60.0;
    let steps = 600;
    for _ in 0..steps {
        animator.advance(dt, &settings);
    }
    let expected = (settings.burn_speed * dt * steps as f32).rem_euclid(1.0);
    assert!((animator.burn_level - expected).abs() < 1e-3);
    assert!((0.0..1.0).contains(&animator.burn_level));
}

#[test]
fn forward_axis_area_projects_to_screen_centre() {
    let mut camera = Camera::new(Vec3::new(4.0, 7.0, 3.0), 0.35, 1.2);
    camera.set_clip_planes(0.5, 5000.0);
    camera.set_aspect(1.6);

    // A small rectangle straight down the camera's forward axis.
    let centre = camera.position + camera.forward() * 80.0;
    let rect = project_area(&camera, centre, 0.5, 0.5, 0.0);
    let mid = rect.centre();
    assert!((mid.x - 0.5).abs() < 1e-3, "centre {:?}", mid);
    assert!((mid.y - 0.5).abs() < 1e-3, "centre {:?}", mid);
}

#[test]
fn adjacent_filters_have_independent_parameter_sets() {
    // Retro and the blur filters, and bloom and gameboy, sit next to each
    // other in the registry; each must declare its own parameters with no
    // leakage between neighbours.
    let registry = EffectRegistry::new();

    let retro = registry.lookup(FilterKind::Retro);
    let blur = registry.lookup(FilterKind::GaussianBlurHorizontal);
    let retro_names: Vec<_> = retro.params.iter().collect();
    assert_eq!(retro_names.len(), 2);
    assert_eq!(blur.params.len(), 1);

    let bloom = registry.lookup(FilterKind::Bloom);
    let gameboy = registry.lookup(FilterKind::Gameboy);
    assert_eq!(bloom.params.len(), 6);
    assert_eq!(gameboy.params.len(), 3);

    // No blur parameter appears in retro's set, and no gameboy parameter in
    // bloom's.
    use afterglow::filter::ParamSlot;
    let slot_name = |s: &ParamSlot| match s {
        ParamSlot::Scalar(n) | ParamSlot::Vector(n) => *n,
    };
    assert!(!retro.params.iter().map(slot_name).any(|n| n == "sigma"));
    assert!(!bloom.params.iter().map(slot_name).any(|n| n == "pixels"));
}

#[test]
fn filter_names_survive_text_round_trip() {
    let registry = EffectRegistry::new();
    for kind in registry.kinds() {
        let descriptor = registry.resolve(kind.name()).unwrap();
        assert_eq!(descriptor.kind, kind);
    }
    assert!(registry.resolve("not_a_filter").is_err());
}
