use approx::assert_relative_eq;
use series_math::{
    difference_stack, lstsq, optimize_smoothing_level, ExponentialSmoothing, MathError,
    StandardScaler,
};

#[test]
fn test_ar_fit_on_differenced_series() {
    // x_t = x_{t-1} + d_t with d_t = 0.5 * d_{t-1} + 1, so d settles at 2
    let mut d = vec![0.0];
    for _ in 1..60 {
        let previous = *d.last().unwrap();
        d.push(0.5 * previous + 1.0);
    }
    let mut x = vec![10.0];
    for value in &d[1..] {
        let previous = *x.last().unwrap();
        x.push(previous + value);
    }

    let (z, integrator) = difference_stack(&x, &[1]).unwrap();
    let rows: Vec<Vec<f64>> = (1..z.len()).map(|t| vec![1.0, z[t - 1]]).collect();
    let beta = lstsq(&rows, &z[1..]).unwrap();
    assert_relative_eq!(beta[0], 1.0, epsilon = 1e-8);
    assert_relative_eq!(beta[1], 0.5, epsilon = 1e-8);

    let next = beta[0] + beta[1] * z[z.len() - 1];
    let restored = integrator.integrate(&[next]);
    assert_relative_eq!(restored[0], x[x.len() - 1] + next, epsilon = 1e-12);
}

#[test]
fn test_estimated_level_feeds_the_smoother() {
    let data: Vec<f64> = (0..50).map(|i| 20.0 + (i as f64 * 0.7).cos()).collect();
    let alpha = optimize_smoothing_level(&data).unwrap();
    assert!(alpha > 0.0 && alpha < 1.0);

    let mut smoother = ExponentialSmoothing::new(alpha).unwrap();
    smoother.update_all(&data);
    assert_eq!(smoother.values_seen(), data.len());
    let level = smoother.level().unwrap();
    assert!((19.0..=21.0).contains(&level));
}

#[test]
fn test_scaler_fitted_on_train_only() {
    let train = [1.0, 2.0, 3.0, 4.0];
    let scaler = StandardScaler::fit(&train).unwrap();
    let scaled = scaler.transform_all(&[4.0, 100.0]);
    assert_relative_eq!(scaled[0], 1.5 / 1.25_f64.sqrt(), epsilon = 1e-12);
    assert_relative_eq!(scaler.inverse(scaled[1]), 100.0, epsilon = 1e-9);
}

#[test]
fn test_kernel_errors() {
    assert!(matches!(
        lstsq(&[vec![1.0, 2.0]], &[1.0]),
        Err(MathError::InsufficientData(_))
    ));
    assert!(matches!(
        optimize_smoothing_level(&[1.0]),
        Err(MathError::InsufficientData(_))
    ));
    assert!(matches!(
        difference_stack(&[1.0, 2.0, 3.0], &[0]),
        Err(MathError::InvalidInput(_))
    ));
}
