//! Helpers for 4-connected regions of a grid.

use super::*;

/// Collects the 4-connected component containing `start` among the
/// locations accepted by `member`.  Returns an empty vector if `start`
/// itself isn't a member.
pub fn flood(dims: Dims, start: Pos, member: impl Fn(Pos) -> bool) -> Vec<Pos> {
  if !dims.contains(start) || !member(start) {
    return Vec::new();
  }
  let mut seen = vec![false; dims.area()];
  let mut found = vec![start];
  seen[start.index(dims)] = true;
  let mut next = 0;
  while next < found.len() {
    let pos = found[next];
    next += 1;
    for n in dims.neighbors(pos) {
      let i = n.index(dims);
      if !seen[i] && member(n) {
        seen[i] = true;
        found.push(n);
      }
    }
  }
  found
}

/// Tells whether the locations accepted by `member` form a single
/// 4-connected component.  An empty set counts as connected.
pub fn is_connected(dims: Dims, member: impl Fn(Pos) -> bool) -> bool {
  let mut members = dims.positions().filter(|&p| member(p));
  let Some(first) = members.next() else {
    return true;
  };
  let total = 1 + members.count();
  flood(dims, first, member).len() == total
}

/// Tells whether every location accepted by `must` can be reached from the
/// others through locations accepted by `may` (which should include all of
/// `must`).  Used to prune searches whose required cells can no longer join
/// up.
pub fn can_connect(dims: Dims, must: impl Fn(Pos) -> bool, may: impl Fn(Pos) -> bool) -> bool {
  let mut required = dims.positions().filter(|&p| must(p));
  let Some(first) = required.next() else {
    return true;
  };
  let reached = flood(dims, first, &may);
  let mut reachable = vec![false; dims.area()];
  for p in reached {
    reachable[p.index(dims)] = true;
  }
  required.all(|p| reachable[p.index(dims)])
}

#[cfg(test)]
mod tests {
  use super::*;

  fn shading(s: &str) -> Grid<bool> {
    Grid::parse_with(s, |c| match c {
      '#' => Some(true),
      '.' => Some(false),
      _ => None,
    })
    .unwrap()
  }

  #[test]
  fn connected_shapes() {
    let g = shading(
      r"
        ##.
        .#.
        .##",
    );
    assert!(is_connected(g.dims(), |p| g[p]));
    assert_eq!(5, flood(g.dims(), Pos::new(0, 0), |p| g[p]).len());
  }

  #[test]
  fn diagonal_contact_is_not_connection() {
    let g = shading(
      r"
        #.
        .#",
    );
    assert!(!is_connected(g.dims(), |p| g[p]));
  }

  #[test]
  fn empty_is_connected() {
    let g = shading("...");
    assert!(is_connected(g.dims(), |p| g[p]));
    assert!(flood(g.dims(), Pos::new(0, 0), |p| g[p]).is_empty());
  }

  #[test]
  fn can_connect_through_open_cells() {
    let g = shading(
      r"
        #..#
        ....",
    );
    let dims = g.dims();
    assert!(can_connect(dims, |p| g[p], |_| true));
    assert!(!can_connect(dims, |p| g[p], |p| g[p]));
  }
}
