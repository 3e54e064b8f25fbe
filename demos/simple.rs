use sentral_fusion::{Ahrs, MahonyFilter, RawSample};

const SAMPLE_PERIOD_US: u32 = 10_000; // 10 ms sample period

fn main() {
    let mut ahrs = Ahrs::new(MahonyFilter::new());

    for step in 0..10 {
        // this loop should repeat each time a new register sample is available
        let raw = RawSample {
            accel: [0, 0, 16384],  // replace with accelerometer counts at ±2 g
            gyro: [0, 0, 1310],    // replace with gyroscope counts at ±250 deg/s
            mag: [160, 0, -277],   // replace with magnetometer counts at 16 bits
        };

        let update = ahrs.update_raw(&raw, step * SAMPLE_PERIOD_US);
        if update.degenerate {
            continue;
        }

        let pose = ahrs.pose();
        println!(
            "t: {} us, Roll: {:.2}, Pitch: {:.2}, Yaw: {:.2}",
            pose.timestamp, pose.euler[0], pose.euler[1], pose.euler[2]
        );
    }
}
