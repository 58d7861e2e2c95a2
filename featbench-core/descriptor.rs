/// Descriptor matrix, one row per keypoint of the same frame.
///
/// Row `i` always describes keypoint `i`; the matcher relies on that
/// alignment to turn row indices into keypoint indices.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptors {
    /// Packed bit strings, `bytes_per_row` bytes per keypoint
    Binary { bytes_per_row: usize, data: Vec<u8> },
    /// Floating point vectors, `dims` elements per keypoint
    Float { dims: usize, data: Vec<f32> },
}

impl Descriptors {
    /// Build a binary matrix from fixed-width rows
    pub fn from_binary_rows<const N: usize>(rows: &[[u8; N]]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * N);
        for row in rows {
            data.extend_from_slice(row);
        }
        Descriptors::Binary {
            bytes_per_row: N,
            data,
        }
    }

    /// Build a float matrix from rows of `dims` elements
    pub fn from_float_rows(dims: usize, rows: &[Vec<f32>]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * dims);
        for row in rows {
            debug_assert_eq!(row.len(), dims);
            data.extend_from_slice(row);
        }
        Descriptors::Float { dims, data }
    }

    pub fn empty_binary(bytes_per_row: usize) -> Self {
        Descriptors::Binary {
            bytes_per_row,
            data: Vec::new(),
        }
    }

    /// Number of elements per row
    pub fn width(&self) -> usize {
        match self {
            Descriptors::Binary { bytes_per_row, .. } => *bytes_per_row,
            Descriptors::Float { dims, .. } => *dims,
        }
    }

    pub fn rows(&self) -> usize {
        match self {
            Descriptors::Binary { bytes_per_row, data } => {
                if *bytes_per_row == 0 {
                    0
                } else {
                    data.len() / bytes_per_row
                }
            }
            Descriptors::Float { dims, data } => {
                if *dims == 0 {
                    0
                } else {
                    data.len() / dims
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Descriptors::Binary { .. })
    }

    pub fn storage_name(&self) -> &'static str {
        match self {
            Descriptors::Binary { .. } => "binary",
            Descriptors::Float { .. } => "float",
        }
    }

    pub fn binary_row(&self, i: usize) -> Option<&[u8]> {
        match self {
            Descriptors::Binary { bytes_per_row, data } if i < self.rows() => {
                Some(&data[i * bytes_per_row..(i + 1) * bytes_per_row])
            }
            _ => None,
        }
    }

    pub fn float_row(&self, i: usize) -> Option<&[f32]> {
        match self {
            Descriptors::Float { dims, data } if i < self.rows() => {
                Some(&data[i * dims..(i + 1) * dims])
            }
            _ => None,
        }
    }

    /// Convert to a float matrix, one element per stored byte
    pub fn to_float(&self) -> Descriptors {
        match self {
            Descriptors::Binary { bytes_per_row, data } => Descriptors::Float {
                dims: *bytes_per_row,
                data: data.iter().map(|&b| b as f32).collect(),
            },
            Descriptors::Float { .. } => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_rows_are_addressable() {
        let desc = Descriptors::from_binary_rows(&[[1u8, 2], [3, 4], [5, 6]]);
        assert_eq!(desc.rows(), 3);
        assert_eq!(desc.width(), 2);
        assert_eq!(desc.binary_row(1), Some(&[3u8, 4][..]));
        assert_eq!(desc.binary_row(3), None);
        assert_eq!(desc.float_row(0), None);
    }

    #[test]
    fn test_to_float_keeps_shape() {
        let desc = Descriptors::from_binary_rows(&[[255u8, 0], [7, 9]]);
        let float = desc.to_float();
        assert_eq!(float.rows(), 2);
        assert_eq!(float.float_row(0), Some(&[255.0f32, 0.0][..]));
        assert_eq!(float.float_row(1), Some(&[7.0f32, 9.0][..]));
    }

    #[test]
    fn test_empty_matrices() {
        assert!(Descriptors::empty_binary(32).is_empty());
        let float = Descriptors::from_float_rows(128, &[]);
        assert_eq!(float.rows(), 0);
        assert_eq!(float.width(), 128);
    }
}
