#[cfg(test)]
mod timing_tests {
    use segaai::clock::{
        Clock, ClockEvent, CPU_CLOCK_HZ, CPU_CYCLES_PER_SCANLINE, SCANLINES_PER_FRAME,
        VBLANK_START_LINE,
    };

    #[test]
    fn test_frame_timing() {
        let mut clock = Clock::new();

        let cycles_per_frame = SCANLINES_PER_FRAME * CPU_CYCLES_PER_SCANLINE;
        let events = clock.tick(cycles_per_frame);

        assert_eq!(
            events,
            vec![
                ClockEvent::VBlankStart,
                ClockEvent::VBlankEnd,
                ClockEvent::FrameEnd
            ]
        );
        assert_eq!(clock.current_scanline(), 0);
        assert_eq!(clock.frame_count(), 1);
        assert!(!clock.is_vblank());
    }

    #[test]
    fn test_vblank_timing() {
        let mut clock = Clock::new();

        let events = clock.tick(VBLANK_START_LINE * CPU_CYCLES_PER_SCANLINE - 1);
        assert!(events.is_empty());
        assert!(!clock.is_vblank());

        let events = clock.tick(1);
        assert_eq!(events, vec![ClockEvent::VBlankStart]);
        assert!(clock.is_vblank());
        assert_eq!(clock.current_scanline(), 212);
    }

    #[test]
    fn test_frame_rate_is_ntsc() {
        let frame = (SCANLINES_PER_FRAME * CPU_CYCLES_PER_SCANLINE) as f64;
        let rate = CPU_CLOCK_HZ as f64 / frame;
        assert!(rate > 59.9 && rate < 60.1, "rate was {}", rate);
    }

    #[test]
    fn test_frame_progress() {
        let mut clock = Clock::new();
        assert_eq!(clock.frame_progress(), 0.0);

        clock.tick((SCANLINES_PER_FRAME * CPU_CYCLES_PER_SCANLINE) / 2);
        let progress = clock.frame_progress();
        assert!(progress > 0.49 && progress < 0.51, "Progress was {}", progress);
    }

    #[test]
    fn test_reset() {
        let mut clock = Clock::new();
        clock.tick(100_000);
        clock.reset();
        assert_eq!(clock.total_cycles(), 0);
        assert_eq!(clock.current_scanline(), 0);
        assert_eq!(clock.frame_count(), 0);
    }
}
