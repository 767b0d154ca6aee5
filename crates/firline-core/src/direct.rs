//! Direct-form convolution.
//!
//! O(N·M) reference implementations used to check the partitioned engine and
//! as a fallback when no engine is available. Not a performance path.

/// Convolve `signal` with a kernel whose length is half the output span.
///
/// With `M = (output.len() + 1) / 2`, computes for every output index `n`:
///
/// ```text
/// output[n] = Σ a[n − m] · b[m],   m in [0, M), n > m, n − m < M
/// ```
///
/// Terms outside that window contribute zero. Note that `n > m` is strict, so
/// `signal[0]` never contributes; feed signals with a leading zero when an
/// exact linear convolution is wanted.
///
/// # Panics
///
/// Panics if `signal` or `kernel` are shorter than `M`.
pub fn convolve(signal: &[f32], kernel: &[f32], output: &mut [f32]) {
    let m_len = (output.len() + 1) / 2;

    for (n, out) in output.iter_mut().enumerate() {
        let mut acc = 0.0;

        for m in 0..m_len {
            if n > m && n - m < m_len {
                acc += signal[n - m] * kernel[m];
            }
        }

        *out = acc;
    }
}

/// Full linear convolution of `signal` and `kernel`.
///
/// `output` must hold at least `signal.len() + kernel.len() - 1` samples;
/// extra samples are zeroed.
pub fn convolve_full(signal: &[f32], kernel: &[f32], output: &mut [f32]) {
    output.fill(0.0);

    if signal.is_empty() || kernel.is_empty() {
        return;
    }

    debug_assert!(output.len() >= signal.len() + kernel.len() - 1);

    for (i, &x) in signal.iter().enumerate() {
        for (j, &h) in kernel.iter().enumerate() {
            output[i + j] += x * h;
        }
    }
}
