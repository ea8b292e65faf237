use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use telemetry_packet::{PACKET_MAGIC, PACKET_VERSION, TelemetryRecord, flags};

/// Шаг симуляции, секунды.
pub const SIM_DT: f64 = 0.1;

const IDLE_RPM: f64 = 800.0;
const REDLINE_RPM: f64 = 16_000.0;
const MAX_GEAR: u8 = 6;
const RPM_NOISE_SIGMA: f64 = 2.5;

// ═══════════════════════════════════════════════════════════════
//  Driver
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    CityCruise,
    HighwaySprint,
    PanicStop,
    Idle,
}

/// Водитель: раз в ~10 секунд бросает кубик и меняет манеру езды.
pub struct Driver {
    state: DriverState,
    timer: u32,
    rng: StdRng,
}

impl Driver {
    pub fn new(seed: u64) -> Self {
        Self { state: DriverState::CityCruise, timer: 0, rng: StdRng::seed_from_u64(seed) }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Положение педали на такте `seq`, от -1 (тормоз в пол) до 1.
    pub fn throttle(&mut self, seq: u32) -> f64 {
        self.timer += 1;
        if self.timer > 100 {
            self.timer = 0;
            let roll: u32 = self.rng.gen_range(0..100);
            self.state = match roll {
                0..=1 => DriverState::PanicStop,
                2..=21 => DriverState::HighwaySprint,
                22..=61 => DriverState::CityCruise,
                91..=99 => DriverState::Idle,
                _ => self.state,
            };
        }

        match self.state {
            DriverState::HighwaySprint => 1.0,
            DriverState::CityCruise => ((seq as f64 * 0.05).sin() + 1.0) / 2.0 * 0.6,
            DriverState::PanicStop => -1.0,
            DriverState::Idle => 0.0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Vehicle physics
// ═══════════════════════════════════════════════════════════════

pub struct Vehicle {
    id: u16,
    /// km/h
    speed: f64,
    rpm: f64,
    /// °C
    temp: f64,
    accel: f64,
    prev_accel: f64,
    gear: u8,
    target_speed: f64,
    throttle: f64,
    battery: f64,
    rng: StdRng,
}

/// Момент двигателя относительно пика на 4500 об/мин.
pub fn torque_curve(rpm: f64) -> f64 {
    let deviation = (rpm - 4500.0) / 4500.0;
    (1.0 - deviation * deviation).clamp(0.3, 1.0)
}

impl Vehicle {
    pub fn new(id: u16, seed: u64) -> Self {
        Self {
            id,
            speed: 0.0,
            rpm: IDLE_RPM,
            temp: 25.0,
            accel: 0.0,
            prev_accel: 0.0,
            gear: 1,
            target_speed: 110.0 + f64::from(id % 50),
            throttle: 0.0,
            battery: 100.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn gear(&self) -> u8 {
        self.gear
    }

    pub fn set_throttle(&mut self, throttle: f64) {
        self.throttle = throttle.clamp(-1.0, 1.0);
    }

    fn update_rpm(&mut self) {
        let ratio = (4.8 - f64::from(self.gear) * 0.65).max(0.8);
        self.rpm = (self.speed * ratio * 25.0).clamp(IDLE_RPM, REDLINE_RPM);
    }

    /// Продвинуть физику на `dt` секунд.
    pub fn tick(&mut self, dt: f64) {
        // Нажатая педаль (газ или тормоз) отключает круиз-контроль.
        let cruise = ((self.target_speed - self.speed) * 0.1).clamp(0.0, 1.0);
        let throttle = if self.throttle != 0.0 { self.throttle } else { cruise };

        let engine = throttle * torque_curve(self.rpm) * 100.0;
        let friction = if self.speed > 0.0 { 5.0 } else { 0.0 };
        let drag = 0.0035 * self.speed * self.speed;

        let mut net = engine - friction - drag;
        if throttle < -0.1 {
            net -= throttle.abs() * 15.0;
        }
        if throttle < 0.05 && self.speed > 0.0 {
            net -= 2.0;
        }

        self.prev_accel = self.accel;
        self.accel = net;
        self.speed = (self.speed + self.accel * dt).max(0.0);

        self.update_rpm();
        if self.rpm > 7500.0 && self.gear < MAX_GEAR {
            self.gear += 1;
            self.update_rpm();
        } else if self.rpm < 2500.0 && self.gear > 1 {
            self.gear -= 1;
            self.update_rpm();
        }

        let heat_in = (self.rpm / 3000.0) * 15.0 * dt;
        let heat_out = (self.temp - 25.0) * 0.2 * dt;
        self.temp = (self.temp + heat_in - heat_out).clamp(25.0, 150.0);

        if self.speed > 0.0 {
            self.battery = (self.battery - 0.05 * dt).max(0.0);
        }
    }

    /// Снимок состояния в пакет с посчитанной контрольной суммой.
    pub fn snapshot(&mut self, sequence_id: u32, timestamp_ms: u64) -> TelemetryRecord {
        let noise: f64 = self.rng.sample::<f64, _>(StandardNormal) * RPM_NOISE_SIGMA;
        let rpm = (self.rpm + noise).clamp(0.0, REDLINE_RPM) as u16;
        let temp = self.temp as u8;
        let battery_level = self.battery as u8;
        let jerk = ((self.accel - self.prev_accel) / SIM_DT * 100.0) as i16;

        let mut flag_bits = 0;
        if temp > 115 {
            flag_bits |= flags::OVERHEAT;
        }
        if battery_level < 20 {
            flag_bits |= flags::LOW_BATTERY;
        }
        if self.accel < -5.0 {
            flag_bits |= flags::ABS_ACTIVE;
        }

        TelemetryRecord {
            magic: PACKET_MAGIC,
            vehicle_id: self.id,
            sequence_id,
            timestamp: timestamp_ms,
            rpm,
            speed: self.speed as u16,
            jerk,
            temp,
            battery_level,
            gear: self.gear,
            flags: flag_bits,
            version: PACKET_VERSION,
            cpu_load: 10 + self.rng.gen_range(0..30),
            crc16: 0,
        }
        .with_checksum()
    }
}
