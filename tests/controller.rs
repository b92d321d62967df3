//! Direct pixel operations and queries through `LedController`.

mod common;

use std::time::Duration;

use common::{controller, InstantPacer, RecordingDriver};
use ledctl::{EffectKind, EngineState};
use ledstrip_transport::{DriverBus, DriverCommand, PixelCommand, Rgb, Timeouts};

const RED: Rgb = Rgb::new(255, 0, 0);
const GREEN: Rgb = Rgb::new(0, 255, 0);
const BLUE: Rgb = Rgb::new(0, 0, 255);

#[tokio::test]
async fn test_set_pixel() {
    let driver = RecordingDriver::new(5);
    let ctl = controller(&driver, InstantPacer::new());

    let result = ctl.set_pixel(2, RED).await;
    assert!(result.success);
    assert_eq!(
        driver.writes(),
        vec![
            DriverCommand::SetPixel {
                index: 2,
                color: RED
            },
            DriverCommand::Show,
        ]
    );
    assert_eq!(driver.shown()[2], RED);
}

#[tokio::test]
async fn test_set_pixel_out_of_range() {
    let driver = RecordingDriver::new(5);
    let ctl = controller(&driver, InstantPacer::new());

    let result = ctl.set_pixel(5, RED).await;
    assert!(!result.success);
    assert_eq!(
        result.message.as_deref(),
        Some("Pixel index 5 out of range (strip has 5 LEDs)")
    );
    assert!(driver.writes().is_empty());
}

#[tokio::test]
async fn test_set_pixels_drops_out_of_range() {
    let driver = RecordingDriver::new(3);
    let ctl = controller(&driver, InstantPacer::new());

    let result = ctl
        .set_pixels(vec![
            PixelCommand::new(0, RED),
            PixelCommand::new(7, GREEN),
            PixelCommand::new(2, BLUE),
        ])
        .await;
    assert!(result.success);
    assert_eq!(
        result.message.as_deref(),
        Some("Set 2 pixels (1 out of range dropped)")
    );
    assert_eq!(driver.shown(), vec![RED, Rgb::BLACK, BLUE]);
}

#[tokio::test]
async fn test_apply_pattern_replaces_whole_strip() {
    let driver = RecordingDriver::new(4);
    let ctl = controller(&driver, InstantPacer::new());

    assert!(ctl.fill(GREEN).await.success);
    let result = ctl
        .apply_pattern(vec![
            PixelCommand::new(1, RED),
            PixelCommand::new(9, BLUE),
            PixelCommand::new(3, BLUE),
        ])
        .await;
    assert!(result.success);
    assert_eq!(
        result.message.as_deref(),
        Some("Applied pattern (2 of 3 entries)")
    );
    assert_eq!(driver.shown(), vec![Rgb::BLACK, RED, Rgb::BLACK, BLUE]);
}

#[tokio::test]
async fn test_set_range_is_inclusive_and_clipped() {
    let driver = RecordingDriver::new(6);
    let ctl = controller(&driver, InstantPacer::new());

    assert!(ctl.set_range(1, 3, RED).await.success);
    assert_eq!(
        driver.shown(),
        vec![Rgb::BLACK, RED, RED, RED, Rgb::BLACK, Rgb::BLACK]
    );

    let clipped = ctl.set_range(4, 100, BLUE).await;
    assert!(clipped.success);
    assert_eq!(clipped.message.as_deref(), Some("Set pixels 4-5 to #0000ff"));
    assert_eq!(driver.shown()[4..], [BLUE, BLUE]);
}

#[tokio::test]
async fn test_set_range_empty() {
    let driver = RecordingDriver::new(6);
    let ctl = controller(&driver, InstantPacer::new());

    assert!(!ctl.set_range(4, 2, RED).await.success);
    assert!(!ctl.set_range(6, 8, RED).await.success);
    assert!(driver.writes().is_empty());
}

#[tokio::test]
async fn test_fill_and_clear() {
    let driver = RecordingDriver::new(4);
    let ctl = controller(&driver, InstantPacer::new());

    let filled = ctl.fill(BLUE).await;
    assert!(filled.success);
    assert_eq!(filled.message.as_deref(), Some("Filled 4 LEDs with #0000ff"));
    assert_eq!(driver.shown(), vec![BLUE; 4]);

    let cleared = ctl.clear().await;
    assert!(cleared.success);
    assert_eq!(cleared.message.as_deref(), Some("Cleared 4 LEDs"));
    assert_eq!(driver.shown(), vec![Rgb::BLACK; 4]);
}

#[tokio::test]
async fn test_zero_leds_short_circuits() {
    let driver = RecordingDriver::new(0);
    let ctl = controller(&driver, InstantPacer::new());

    let fill = ctl.fill(RED).await;
    assert!(!fill.success);
    assert_eq!(fill.message.as_deref(), Some("Driver reports 0 LEDs"));

    let effect = ctl.rainbow(10).await;
    assert!(!effect.success);
    assert_eq!(effect.message.as_deref(), Some("Driver reports 0 LEDs"));
    assert_eq!(ctl.state(), EngineState::Idle);

    assert!(!ctl.stop_animation().await.success);
    assert!(driver.writes().is_empty());
}

#[tokio::test]
async fn test_direct_write_preempts_effect() {
    let driver = RecordingDriver::new(5);
    let ctl = controller(&driver, InstantPacer::new());

    assert!(ctl.infinite_chase(RED, 2, 100).await.success);
    tokio::task::yield_now().await;

    assert!(ctl.fill(GREEN).await.success);
    assert_eq!(ctl.state(), EngineState::Idle);
    assert_eq!(ctl.stats().cancelled, 1);

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(driver.shown(), vec![GREEN; 5]);
}

#[tokio::test]
async fn test_preemption_can_be_disabled() {
    let driver = RecordingDriver::new(5);
    let bus = DriverBus::from_transport(driver.clone(), Timeouts::default(), 16);
    let ctl = ledctl::LedController::new(bus, InstantPacer::new()).preempt_on_direct(false);

    assert!(ctl.infinite_chase(RED, 2, 100).await.success);
    assert!(ctl.set_pixel(0, BLUE).await.success);
    assert_eq!(ctl.active_effect(), Some(EffectKind::InfiniteChase));
    assert!(ctl.stop_animation().await.success);
}

#[tokio::test]
async fn test_concurrent_direct_calls_are_serialized() {
    let driver = RecordingDriver::new(8);
    driver.set_delay(Duration::from_millis(2));
    let ctl = std::sync::Arc::new(controller(&driver, InstantPacer::new()));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let ctl = ctl.clone();
            tokio::spawn(async move { ctl.set_pixel(i, RED).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().success);
    }

    assert_eq!(driver.shown(), vec![RED; 8]);
    // Each set_pixel is immediately followed by its own show
    let writes = driver.writes();
    for pair in writes.chunks(2) {
        assert!(matches!(pair[0], DriverCommand::SetPixel { .. }));
        assert_eq!(pair[1], DriverCommand::Show);
    }
}

#[tokio::test]
async fn test_get_config_and_status() {
    let driver = RecordingDriver::new(30);
    driver.set_brightness(0.25);
    let ctl = controller(&driver, InstantPacer::new());

    let config = ctl.get_config().await;
    assert!(config.success);
    let config = config.data.unwrap();
    assert_eq!(config.led_count, 30);
    assert_eq!(config.brightness, 0.25);
    assert_eq!(ctl.cache().current(), config);

    let status = ctl.get_status().await;
    assert!(status.success);
    assert_eq!(status.data.unwrap().led_count, 30);

    driver.set_unreachable(true);
    let down = ctl.get_config().await;
    assert!(!down.success);
    assert_eq!(down.message.as_deref(), Some("LED driver unreachable"));
    assert!(!ctl.get_status().await.success);
    // Stale value survives a failed refresh
    assert_eq!(ctl.cache().current().led_count, 30);
}

#[tokio::test]
async fn test_direct_commands_use_command_budget() {
    let driver = RecordingDriver::new(4);
    let budgets = Timeouts {
        command: Duration::from_millis(750),
        effect: Duration::from_millis(120),
    };
    let bus = DriverBus::from_transport(driver.clone(), budgets, 16);
    let ctl = ledctl::LedController::new(bus, InstantPacer::new());
    assert_eq!(ctl.bus().client().timeouts(), budgets);
    assert_eq!(ctl.bus().client().endpoint(), "memory://driver");

    assert!(ctl.set_pixel(1, RED).await.success);
    assert!(ctl.set_pixels(vec![PixelCommand::new(0, BLUE)]).await.success);
    assert!(ctl.set_range(0, 1, GREEN).await.success);
    assert!(ctl.apply_pattern(vec![PixelCommand::new(2, RED)]).await.success);
    assert!(ctl.fill(BLUE).await.success);
    assert!(ctl.set_brightness(0.4).await.success);
    assert!(ctl.get_config().await.success);

    let all = driver.timeouts_of(|_| true);
    assert!(all.len() > 10);
    assert!(all.iter().all(|t| *t == budgets.command), "{all:?}");
}

#[tokio::test]
async fn test_brightness_updates_cache() {
    let driver = RecordingDriver::new(3);
    let ctl = controller(&driver, InstantPacer::new());

    assert!(ctl.get_config().await.success);
    assert!(ctl.set_brightness(0.75).await.success);
    assert_eq!(ctl.cache().current().brightness, 0.75);
}

#[tokio::test]
async fn test_every_operation_fails_cleanly_when_driver_rejects() {
    let driver = RecordingDriver::new(4);
    driver.set_reject_all(true);
    let ctl = controller(&driver, InstantPacer::new());

    let results = vec![
        ctl.set_pixel(0, RED).await,
        ctl.set_pixels(vec![PixelCommand::new(1, RED)]).await,
        ctl.set_range(0, 2, RED).await,
        ctl.apply_pattern(vec![PixelCommand::new(3, RED)]).await,
        ctl.fill(RED).await,
        ctl.clear().await,
        ctl.set_brightness(0.5).await,
        ctl.rainbow(10).await,
        ctl.wave(RED, 10).await,
        ctl.breathe(RED, 100).await,
        ctl.sparkle(RED, 1, 100).await,
        ctl.chase(RED, 2, 10).await,
        ctl.fade_transition(RED, BLUE, 100).await,
        ctl.infinite_chase(RED, 2, 10).await,
        ctl.chase(RED, usize::MAX, 1).await,
        ctl.sparkle(RED, usize::MAX, 100).await,
    ];
    for (i, result) in results.iter().enumerate() {
        assert!(!result.success, "operation {i} reported success");
        assert!(result.message.is_some());
    }
    assert!(!ctl.get_config().await.success);
    assert!(!ctl.get_status().await.success);
    assert!(!ctl.stop_animation().await.success);
    assert_eq!(ctl.state(), EngineState::Idle);

    // The lane is still usable once the driver recovers
    driver.set_reject_all(false);
    assert!(ctl.fill(GREEN).await.success);
    assert_eq!(driver.shown(), vec![GREEN; 4]);
}
