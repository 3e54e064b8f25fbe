use nalgebra::{UnitQuaternion, Vector3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use sentral_fusion::{
    AttitudeFilter, DEG_TO_RAD, MadgwickFilter, MadgwickSettings, MahonyFilter, MahonySettings,
};

const EPSILON: f32 = 1e-5;

/// Magnetic dip angle of the synthetic field
const DIP_DEGREES: f32 = 60.0;

/// Accelerometer and magnetometer readings of a board held still at `orientation`
fn stationary_readings(orientation: &UnitQuaternion<f32>) -> (Vector3<f32>, Vector3<f32>) {
    let dip = DIP_DEGREES * DEG_TO_RAD;
    let field = Vector3::new(dip.cos(), 0.0, -dip.sin());
    (
        orientation.inverse_transform_vector(&Vector3::z()),
        orientation.inverse_transform_vector(&field),
    )
}

fn random_vector(rng: &mut Pcg64, range: f32) -> Vector3<f32> {
    Vector3::new(
        rng.random_range(-range..range),
        rng.random_range(-range..range),
        rng.random_range(-range..range),
    )
}

fn random_orientation(rng: &mut Pcg64) -> UnitQuaternion<f32> {
    UnitQuaternion::from_euler_angles(
        rng.random_range(-60.0..60.0_f32) * DEG_TO_RAD,
        rng.random_range(-60.0..60.0_f32) * DEG_TO_RAD,
        rng.random_range(-120.0..120.0_f32) * DEG_TO_RAD,
    )
}

fn filters() -> Vec<(&'static str, Box<dyn AttitudeFilter>)> {
    vec![
        ("madgwick", Box::new(MadgwickFilter::new())),
        (
            "madgwick+bias",
            Box::new(MadgwickFilter::with_settings(MadgwickSettings {
                gyro_measurement_drift: 0.2,
                ..Default::default()
            })),
        ),
        ("mahony", Box::new(MahonyFilter::new())),
        (
            "mahony+integral",
            Box::new(MahonyFilter::with_settings(MahonySettings { kp: 5.0, ki: 0.1 })),
        ),
    ]
}

/// Quaternion stays unit length under arbitrary input
#[test]
fn test_unit_norm_under_random_input() {
    let mut rng = Pcg64::seed_from_u64(1);

    for (name, mut filter) in filters() {
        for _ in 0..2000 {
            let gyroscope = random_vector(&mut rng, 5.0);
            let accelerometer = random_vector(&mut rng, 2.0);
            let magnetometer = random_vector(&mut rng, 500.0);
            let delta_time = rng.random_range(0.001..0.05);

            let update = filter.update(gyroscope, accelerometer, magnetometer, delta_time);
            let norm = update.quaternion.as_ref().norm();
            assert!((norm - 1.0).abs() < EPSILON, "{name}: norm {norm}");
        }
    }
}

/// A zero interval integrates nothing
#[test]
fn test_zero_interval_keeps_orientation() {
    let mut rng = Pcg64::seed_from_u64(2);

    for (name, mut filter) in filters() {
        let start = random_orientation(&mut rng);
        filter.set_quaternion(start);

        let update = filter.update(
            random_vector(&mut rng, 3.0),
            random_vector(&mut rng, 2.0),
            random_vector(&mut rng, 500.0),
            0.0,
        );
        assert!(!update.degenerate);
        let drift = (update.quaternion.coords - start.coords).norm();
        assert!(drift < EPSILON, "{name}: drift {drift}");
    }
}

/// Zero-length accelerometer or magnetometer readings skip the update
#[test]
fn test_degenerate_readings_leave_state_untouched() {
    let (accel, mag) = stationary_readings(&UnitQuaternion::identity());

    for (name, mut filter) in filters() {
        let start = UnitQuaternion::from_euler_angles(0.1, -0.2, 0.3);
        filter.set_quaternion(start);

        for (accelerometer, magnetometer) in [(Vector3::zeros(), mag), (accel, Vector3::zeros())] {
            let update = filter.update(Vector3::new(1.0, 1.0, 1.0), accelerometer, magnetometer, 0.01);
            assert!(update.degenerate, "{name}");
            assert_eq!(update.quaternion, start, "{name}");
            assert_eq!(filter.quaternion(), start, "{name}");
        }
    }
}

/// With all feedback disabled both filters are plain gyroscope integrators
#[test]
fn test_gyro_integration_without_feedback() {
    let integrators: Vec<Box<dyn AttitudeFilter>> = vec![
        Box::new(MadgwickFilter::with_settings(MadgwickSettings {
            gyro_measurement_error: 0.0,
            gyro_measurement_drift: 0.0,
        })),
        Box::new(MahonyFilter::with_settings(MahonySettings { kp: 0.0, ki: 0.0 })),
    ];

    let (accel, mag) = stationary_readings(&UnitQuaternion::identity());
    let gyroscope = Vector3::new(0.0, 0.0, 10.0 * DEG_TO_RAD);

    for mut filter in integrators {
        for _ in 0..100 {
            filter.update(gyroscope, accel, mag, 0.01);
        }

        let (roll, pitch, yaw) = filter.quaternion().euler_angles();
        assert!((yaw / DEG_TO_RAD - 10.0).abs() < 0.05, "yaw {}", yaw / DEG_TO_RAD);
        assert!(roll.abs() < EPSILON);
        assert!(pitch.abs() < EPSILON);
    }
}

/// Both filters settle on the same stationary orientation from identity
#[test]
fn test_convergence_from_random_orientations() {
    let mut rng = Pcg64::seed_from_u64(3);

    for _ in 0..5 {
        let truth = random_orientation(&mut rng);
        let (accel, mag) = stationary_readings(&truth);

        let mut madgwick = MadgwickFilter::with_settings(MadgwickSettings {
            gyro_measurement_error: 5.0,
            ..Default::default()
        });
        let mut mahony = MahonyFilter::new();

        for _ in 0..6000 {
            madgwick.update(Vector3::zeros(), accel, mag, 0.01);
            mahony.update(Vector3::zeros(), accel, mag, 0.01);
        }

        let madgwick_error = madgwick.quaternion().angle_to(&truth) / DEG_TO_RAD;
        let mahony_error = mahony.quaternion().angle_to(&truth) / DEG_TO_RAD;
        assert!(madgwick_error < 1.0, "madgwick error {madgwick_error} deg");
        assert!(mahony_error < 1.0, "mahony error {mahony_error} deg");
    }
}

/// Disabled integral feedback never accumulates error
#[test]
fn test_mahony_integral_disabled() {
    let mut rng = Pcg64::seed_from_u64(4);
    let mut filter = MahonyFilter::with_settings(MahonySettings { kp: 2.0, ki: 0.0 });

    for _ in 0..1000 {
        filter.update(
            random_vector(&mut rng, 1.0),
            random_vector(&mut rng, 2.0),
            random_vector(&mut rng, 500.0),
            0.01,
        );
        assert_eq!(filter.integral(), Vector3::zeros());
    }
}

/// Reset returns every filter to identity
#[test]
fn test_reset() {
    let (accel, mag) = stationary_readings(&UnitQuaternion::from_euler_angles(0.3, 0.2, 1.0));

    for (name, mut filter) in filters() {
        for _ in 0..100 {
            filter.update(Vector3::new(0.1, 0.2, 0.3), accel, mag, 0.01);
        }
        filter.reset();
        assert_eq!(filter.quaternion(), UnitQuaternion::identity(), "{name}");
    }
}
