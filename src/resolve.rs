use crate::report::{Addr, BinaryImage};

/// The binary image a stack frame pointer was located in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLocation<'a> {
    /// Display name of the containing image.
    pub image_name: &'a str,
    /// Base address of the containing image.
    pub base_address: Addr,
    /// Distance of the pointer from the image base.
    pub offset: u64,
}

/// Finds the image containing `addr` and the pointer's offset within it.
///
/// An image matches if `base <= addr < base + size`. When ranges overlap,
/// the first match in image-list order wins; overlapping ranges are a
/// data-quality problem in the source report, and resolution stays
/// deterministic rather than trying to pick a best fit. Returns `None` for
/// pointers outside every image, which callers render as an unknown
/// location instead of failing.
pub fn resolve<'a>(addr: Addr, images: &'a [BinaryImage]) -> Option<ResolvedLocation<'a>> {
    images
        .iter()
        .find(|image| image.contains(addr))
        .map(|image| ResolvedLocation {
            image_name: image.name(),
            base_address: image.base_address,
            offset: addr.0 - image.base_address.0,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(base: u64, size: u64, path: &str) -> BinaryImage {
        BinaryImage {
            base_address: Addr(base),
            size,
            path: path.into(),
            uuid: None,
        }
    }

    #[test]
    fn test_resolves_to_containing_image() {
        let images = vec![
            image(0x1000, 0x100, "/usr/lib/liba.dylib"),
            image(0x2000, 0x100, "/usr/lib/libb.dylib"),
        ];
        let location = resolve(Addr(0x2040), &images).unwrap();
        assert_eq!(location.image_name, "libb.dylib");
        assert_eq!(location.base_address, Addr(0x2000));
        assert_eq!(location.offset, 0x40);
    }

    #[test]
    fn test_unresolved_pointer_is_none() {
        let images = vec![image(0x1000, 0x100, "a")];
        assert_eq!(resolve(Addr(0x3000), &images), None);
        assert_eq!(resolve(Addr(0x1100), &images), None);
    }

    #[test]
    fn test_overlapping_ranges_use_first_match() {
        // second image erroneously starts inside the first; list order wins
        let images = vec![
            image(0x1000, 0x1000, "/first"),
            image(0x1800, 0x1000, "/second"),
        ];
        let location = resolve(Addr(0x1900), &images).unwrap();
        assert_eq!(location.image_name, "first");
        assert_eq!(location.offset, 0x900);
    }

    #[test]
    fn test_empty_image_list() {
        assert_eq!(resolve(Addr(0x1000), &[]), None);
    }
}
