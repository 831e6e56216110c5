//! Quadrature rotary encoder decoder.
//!
//! An explicit finite-state machine: a transition table keyed by
//! (state, two-bit pin sample) gives the next state and the event emitted
//! on that edge, if any. The table absorbs contact bounce - illegal or
//! repeated samples walk back to a resting state without emitting.
//!
//! Full-step mode emits one event per detent (at the 11 rest position);
//! half-step mode emits at both rest positions (00 and 11).

/// Discrete rotation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/// Which decode table to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    /// One event per detent cycle.
    #[default]
    Full,
    /// One event per half cycle.
    Half,
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    next: u8,
    emit: Option<Direction>,
}

const fn go(next: u8) -> Transition {
    Transition { next, emit: None }
}

const fn cw(next: u8) -> Transition {
    Transition {
        next,
        emit: Some(Direction::Clockwise),
    }
}

const fn ccw(next: u8) -> Transition {
    Transition {
        next,
        emit: Some(Direction::CounterClockwise),
    }
}

// Full-step states.
const F_START: u8 = 0;
const F_CW_FINAL: u8 = 1;
const F_CW_BEGIN: u8 = 2;
const F_CW_NEXT: u8 = 3;
const F_CCW_BEGIN: u8 = 4;
const F_CCW_FINAL: u8 = 5;
const F_CCW_NEXT: u8 = 6;

// Rows are states, columns are pin samples 00, 01, 10, 11.
const FULL_STEP: [[Transition; 4]; 7] = [
    // F_START
    [go(F_START), go(F_CW_BEGIN), go(F_CCW_BEGIN), go(F_START)],
    // F_CW_FINAL
    [go(F_CW_NEXT), go(F_START), go(F_CW_FINAL), cw(F_START)],
    // F_CW_BEGIN
    [go(F_CW_NEXT), go(F_CW_BEGIN), go(F_START), go(F_START)],
    // F_CW_NEXT
    [go(F_CW_NEXT), go(F_CW_BEGIN), go(F_CW_FINAL), go(F_START)],
    // F_CCW_BEGIN
    [go(F_CCW_NEXT), go(F_START), go(F_CCW_BEGIN), go(F_START)],
    // F_CCW_FINAL
    [go(F_CCW_NEXT), go(F_CCW_FINAL), go(F_START), ccw(F_START)],
    // F_CCW_NEXT
    [go(F_CCW_NEXT), go(F_CCW_FINAL), go(F_CCW_BEGIN), go(F_START)],
];

// Half-step states.
const H_START: u8 = 0;
const H_CCW_BEGIN: u8 = 1;
const H_CW_BEGIN: u8 = 2;
const H_START_M: u8 = 3;
const H_CW_BEGIN_M: u8 = 4;
const H_CCW_BEGIN_M: u8 = 5;

const HALF_STEP: [[Transition; 4]; 6] = [
    // H_START (resting at 00)
    [go(H_START_M), go(H_CW_BEGIN), go(H_CCW_BEGIN), go(H_START)],
    // H_CCW_BEGIN
    [ccw(H_START_M), go(H_START), go(H_CCW_BEGIN), go(H_START)],
    // H_CW_BEGIN
    [cw(H_START_M), go(H_CW_BEGIN), go(H_START), go(H_START)],
    // H_START_M (resting at 11)
    [go(H_START_M), go(H_CCW_BEGIN_M), go(H_CW_BEGIN_M), go(H_START)],
    // H_CW_BEGIN_M
    [go(H_START_M), go(H_START_M), go(H_CW_BEGIN_M), cw(H_START)],
    // H_CCW_BEGIN_M
    [go(H_START_M), go(H_CCW_BEGIN_M), go(H_START_M), ccw(H_START)],
];

/// Table-driven two-bit quadrature decoder.
///
/// Feed it raw pin levels once per poll; it emits at most one event per
/// sample.
#[derive(Debug)]
pub struct RotaryDecoder {
    table: &'static [[Transition; 4]],
    state: u8,
    /// Set when the encoder is wired for pulldown logic and pin levels
    /// read inverted.
    invert: bool,
}

impl RotaryDecoder {
    pub fn new(mode: StepMode) -> Self {
        let table: &'static [[Transition; 4]] = match mode {
            StepMode::Full => &FULL_STEP,
            StepMode::Half => &HALF_STEP,
        };
        Self {
            table,
            state: 0,
            invert: false,
        }
    }

    /// Flip pin polarity for pulldown-wired encoders.
    pub fn with_inverted_pins(mut self) -> Self {
        self.invert = true;
        self
    }

    /// Advance the state machine with one pin sample.
    pub fn process(&mut self, pin_a: bool, pin_b: bool) -> Option<Direction> {
        let (a, b) = if self.invert {
            (!pin_a, !pin_b)
        } else {
            (pin_a, pin_b)
        };
        let sample = ((b as usize) << 1) | (a as usize);
        let transition = self.table[self.state as usize][sample];
        self.state = transition.next;
        transition.emit
    }
}

impl Default for RotaryDecoder {
    fn default() -> Self {
        Self::new(StepMode::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Quadrature samples for one clockwise detent in full-step mode.
    const CW_CYCLE: [(bool, bool); 4] = [(true, false), (false, false), (false, true), (true, true)];

    /// The same detent walked in the opposite direction.
    const CCW_CYCLE: [(bool, bool); 4] =
        [(false, true), (false, false), (true, false), (true, true)];

    fn run_cycle(decoder: &mut RotaryDecoder, cycle: &[(bool, bool)]) -> Vec<Direction> {
        cycle
            .iter()
            .filter_map(|&(a, b)| decoder.process(a, b))
            .collect()
    }

    #[test]
    fn test_full_step_emits_once_per_cw_detent() {
        let mut decoder = RotaryDecoder::new(StepMode::Full);
        assert_eq!(run_cycle(&mut decoder, &CW_CYCLE), vec![Direction::Clockwise]);
        assert_eq!(run_cycle(&mut decoder, &CW_CYCLE), vec![Direction::Clockwise]);
    }

    #[test]
    fn test_full_step_emits_once_per_ccw_detent() {
        let mut decoder = RotaryDecoder::new(StepMode::Full);
        assert_eq!(
            run_cycle(&mut decoder, &CCW_CYCLE),
            vec![Direction::CounterClockwise]
        );
    }

    #[test]
    fn test_repeated_samples_emit_nothing() {
        let mut decoder = RotaryDecoder::new(StepMode::Full);
        for _ in 0..32 {
            assert_eq!(decoder.process(true, true), None);
        }
    }

    #[test]
    fn test_bounce_mid_cycle_does_not_double_emit() {
        let mut decoder = RotaryDecoder::new(StepMode::Full);
        // Start a clockwise cycle, bounce between two adjacent samples,
        // then finish. Exactly one event must come out.
        let samples = [
            (true, false),
            (false, false),
            (true, false),
            (false, false),
            (false, true),
            (true, true),
        ];
        let events: Vec<_> = samples
            .iter()
            .filter_map(|&(a, b)| decoder.process(a, b))
            .collect();
        assert_eq!(events, vec![Direction::Clockwise]);
    }

    #[test]
    fn test_half_step_emits_twice_per_full_cycle() {
        let mut decoder = RotaryDecoder::new(StepMode::Half);
        let events = run_cycle(&mut decoder, &CW_CYCLE);
        assert_eq!(events, vec![Direction::Clockwise, Direction::Clockwise]);
    }

    #[test]
    fn test_inverted_pins_mirror_plain_decoding() {
        let mut plain = RotaryDecoder::new(StepMode::Full);
        let mut inverted = RotaryDecoder::new(StepMode::Full).with_inverted_pins();

        for &(a, b) in &CW_CYCLE {
            let expect = plain.process(a, b);
            assert_eq!(inverted.process(!a, !b), expect);
        }
    }
}
