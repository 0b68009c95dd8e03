/// Размер одной выборки двух поляризаций в байтах
pub const BYTES_PER_SAMPLE: usize = 4;

/// Комплексная выборка двух поляризаций, 8 бит на компоненту.
///
/// Порядок байтов на диске: `xi, xq, yi, yq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DualPolSample {
    pub xi: i8,
    pub xq: i8,
    pub yi: i8,
    pub yq: i8,
}

impl DualPolSample {
    pub fn from_bytes(b: [u8; BYTES_PER_SAMPLE]) -> Self {
        Self {
            xi: b[0] as i8,
            xq: b[1] as i8,
            yi: b[2] as i8,
            yq: b[3] as i8,
        }
    }

    pub fn to_bytes(&self) -> [u8; BYTES_PER_SAMPLE] {
        [self.xi as u8, self.xq as u8, self.yi as u8, self.yq as u8]
    }

    /// Разбирает байтовый срез на выборки; неполный хвост отбрасывается.
    pub fn iter_bytes(bytes: &[u8]) -> impl Iterator<Item = DualPolSample> + Clone + '_ {
        bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|c| Self::from_bytes([c[0], c[1], c[2], c[3]]))
    }

    /// Мгновенная мощность X: xi² + xq²
    pub fn x_power(&self) -> f64 {
        let (i, q) = (self.xi as f64, self.xq as f64);
        i * i + q * q
    }

    /// Мгновенная мощность Y: yi² + yq²
    pub fn y_power(&self) -> f64 {
        let (i, q) = (self.yi as f64, self.yq as f64);
        i * i + q * q
    }

    /// Действительная часть взаимного произведения: xi·yi + xq·yq
    pub fn cross_re(&self) -> f64 {
        self.xi as f64 * self.yi as f64 + self.xq as f64 * self.yq as f64
    }

    /// Мнимая часть взаимного произведения: xq·yi − xi·yq
    pub fn cross_im(&self) -> f64 {
        self.xq as f64 * self.yi as f64 - self.xi as f64 * self.yq as f64
    }
}
